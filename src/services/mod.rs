pub mod files;
pub mod imports;
pub mod inventory;
