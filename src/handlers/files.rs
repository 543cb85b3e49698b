use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::file,
    errors::{ImportError, ServiceError, ValidationError},
    services::imports::UploadedFile,
    AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportResponse {
    pub file: file::Model,
    pub inventory_created: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileUrlResponse {
    pub url: String,
}

/// Import a spreadsheet file.
///
/// Multipart fields: `file` (the spreadsheet), `name` (display name),
/// `actor_id` (uuid of the acting user) and optional `derive_inventory`
/// (defaults to true).
#[utoipa::path(
    post,
    path = "/api/v1/files/import",
    responses(
        (status = 201, description = "File imported", body = ImportResponse),
        (status = 400, description = "Rejected by validation or decoding", body = crate::errors::ErrorResponse),
        (status = 413, description = "File exceeds the 10 MiB limit", body = crate::errors::ErrorResponse),
        (status = 500, description = "Storage or datastore failure", body = crate::errors::ErrorResponse)
    ),
    tag = "files"
)]
pub async fn import_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ImportError> {
    let mut display_name: Option<String> = None;
    let mut actor_id: Option<Uuid> = None;
    let mut derive_inventory = true;
    let mut upload: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => {
                display_name = Some(field.text().await.map_err(multipart_error)?);
            }
            "actor_id" => {
                let raw = field.text().await.map_err(multipart_error)?;
                let parsed = raw.parse::<Uuid>().map_err(|_| {
                    ImportError::Validation(ValidationError::InvalidField {
                        field: "actor_id",
                        value: raw,
                    })
                })?;
                actor_id = Some(parsed);
            }
            "derive_inventory" => {
                let raw = field.text().await.map_err(multipart_error)?;
                derive_inventory = !matches!(raw.trim(), "false" | "0" | "no");
            }
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes: Bytes = field.bytes().await.map_err(multipart_error)?;
                upload = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    let upload =
        upload.ok_or(ImportError::Validation(ValidationError::MissingRequiredField("file")))?;
    let display_name = display_name
        .ok_or(ImportError::Validation(ValidationError::MissingRequiredField("name")))?;
    let actor_id = actor_id
        .ok_or(ImportError::Validation(ValidationError::MissingRequiredField("actor_id")))?;

    let outcome = state
        .imports
        .import(upload, &display_name, actor_id, derive_inventory)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ImportResponse {
            file: outcome.file,
            inventory_created: outcome.inventory_created,
        }),
    ))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ImportError {
    ImportError::Validation(ValidationError::InvalidField {
        field: "multipart",
        value: e.to_string(),
    })
}

/// List imported files, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/files",
    responses(
        (status = 200, description = "Imported files", body = [file::Model]),
        (status = 500, description = "Datastore failure", body = crate::errors::ErrorResponse)
    ),
    tag = "files"
)]
pub async fn list_files(
    State(state): State<AppState>,
) -> Result<Json<Vec<file::Model>>, ServiceError> {
    Ok(Json(state.files.list().await?))
}

/// Fetch one file with its parsed content snapshot.
#[utoipa::path(
    get,
    path = "/api/v1/files/{id}",
    params(("id" = Uuid, Path, description = "File id")),
    responses(
        (status = 200, description = "File", body = file::Model),
        (status = 404, description = "Unknown file", body = crate::errors::ErrorResponse)
    ),
    tag = "files"
)]
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<file::Model>, ServiceError> {
    Ok(Json(state.files.get(id).await?))
}

/// Public URL of the stored blob.
#[utoipa::path(
    get,
    path = "/api/v1/files/{id}/url",
    params(("id" = Uuid, Path, description = "File id")),
    responses(
        (status = 200, description = "Blob URL", body = FileUrlResponse),
        (status = 404, description = "Unknown file", body = crate::errors::ErrorResponse)
    ),
    tag = "files"
)]
pub async fn file_url(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FileUrlResponse>, ServiceError> {
    let url = state.files.public_url(id).await?;
    Ok(Json(FileUrlResponse { url }))
}

/// Delete a file: blob removal is best-effort, the metadata row is
/// authoritative. Inventory items derived from the file are left in place.
#[utoipa::path(
    delete,
    path = "/api/v1/files/{id}",
    params(("id" = Uuid, Path, description = "File id")),
    responses(
        (status = 204, description = "File deleted"),
        (status = 404, description = "Unknown file", body = crate::errors::ErrorResponse)
    ),
    tag = "files"
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.files.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
