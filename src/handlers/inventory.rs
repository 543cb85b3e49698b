use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    entities::inventory_item,
    errors::ServiceError,
    services::inventory::InventoryItemInput,
    AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryWriteRequest {
    /// Acting user; every reconciliation write names its actor explicitly.
    pub actor_id: Uuid,
    #[serde(flatten)]
    pub item: InventoryItemInput,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ActorParams {
    pub actor_id: Uuid,
}

/// List the inventory attached to one file, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/files/{id}/inventory",
    params(("id" = Uuid, Path, description = "Parent file id")),
    responses(
        (status = 200, description = "Inventory items", body = [inventory_item::Model]),
        (status = 500, description = "Datastore failure", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
) -> Result<Json<Vec<inventory_item::Model>>, ServiceError> {
    Ok(Json(state.inventory.list_for_file(file_id).await?))
}

/// Create one inventory item under a file.
#[utoipa::path(
    post,
    path = "/api/v1/files/{id}/inventory",
    params(("id" = Uuid, Path, description = "Parent file id")),
    request_body = InventoryWriteRequest,
    responses(
        (status = 201, description = "Item created", body = inventory_item::Model),
        (status = 400, description = "Missing or invalid field", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_inventory_item(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Json(request): Json<InventoryWriteRequest>,
) -> Result<(StatusCode, Json<inventory_item::Model>), ServiceError> {
    let item = state
        .inventory
        .create(file_id, request.item, request.actor_id)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Update an inventory item. Omitted fields keep their stored values;
/// required fields are re-checked against the merged record.
#[utoipa::path(
    put,
    path = "/api/v1/inventory/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = InventoryWriteRequest,
    responses(
        (status = 200, description = "Item updated", body = inventory_item::Model),
        (status = 400, description = "Missing or invalid field", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown item", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_inventory_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Json(request): Json<InventoryWriteRequest>,
) -> Result<Json<inventory_item::Model>, ServiceError> {
    let item = state
        .inventory
        .update(item_id, request.item, request.actor_id)
        .await?;
    Ok(Json(item))
}

/// Delete an inventory item.
#[utoipa::path(
    delete,
    path = "/api/v1/inventory/{id}",
    params(
        ("id" = Uuid, Path, description = "Item id"),
        ActorParams
    ),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Unknown item", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn delete_inventory_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Query(params): Query<ActorParams>,
) -> Result<StatusCode, ServiceError> {
    state.inventory.delete(item_id, params.actor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
