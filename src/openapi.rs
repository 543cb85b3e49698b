use axum::Json;
use utoipa::OpenApi;

use crate::entities::{file, inventory_item};
use crate::errors::ErrorResponse;
use crate::handlers;
use crate::handlers::files::{FileUrlResponse, ImportResponse};
use crate::handlers::inventory::InventoryWriteRequest;
use crate::services::inventory::InventoryItemInput;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inventario API",
        description = "Spreadsheet import and inventory reconciliation for the data-center asset dashboard"
    ),
    paths(
        handlers::files::import_file,
        handlers::files::list_files,
        handlers::files::get_file,
        handlers::files::file_url,
        handlers::files::delete_file,
        handlers::inventory::list_inventory,
        handlers::inventory::create_inventory_item,
        handlers::inventory::update_inventory_item,
        handlers::inventory::delete_inventory_item,
    ),
    components(schemas(
        file::Model,
        inventory_item::Model,
        ImportResponse,
        FileUrlResponse,
        InventoryWriteRequest,
        InventoryItemInput,
        ErrorResponse,
    )),
    tags(
        (name = "files", description = "Spreadsheet import and file lifecycle"),
        (name = "inventory", description = "Inventory reconciliation")
    )
)]
pub struct ApiDoc;

pub async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
