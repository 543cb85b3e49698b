pub mod files;
pub mod inventory;

use axum::{
    extract::DefaultBodyLimit,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::imports::MAX_IMPORT_BYTES;
use crate::AppState;

/// Builds the full application router over shared state.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(crate::openapi::openapi_spec))
        .route("/api/v1/files", get(files::list_files))
        .route("/api/v1/files/import", post(files::import_file))
        .route(
            "/api/v1/files/{id}",
            get(files::get_file).delete(files::delete_file),
        )
        .route("/api/v1/files/{id}/url", get(files::file_url))
        .route(
            "/api/v1/files/{id}/inventory",
            get(inventory::list_inventory).post(inventory::create_inventory_item),
        )
        .route(
            "/api/v1/inventory/{id}",
            put(inventory::update_inventory_item).delete(inventory::delete_inventory_item),
        )
        // The multipart body must fit the import ceiling plus field overhead.
        .layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES + 64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
