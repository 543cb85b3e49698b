pub mod file;
pub mod inventory_item;
