use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// JSON error envelope returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable description naming the step that failed
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(status: StatusCode, message: String) -> Self {
        Self {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse::new(status, message))).into_response()
}

/// Pre-conditions on an upload or on inventory fields.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("unsupported file type '{0}'; expected .xlsx, .xls, .xlsb, .ods or .csv")]
    InvalidType(String),

    #[error("file is {size} bytes; imports are limited to {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("spreadsheet needs a header row and at least one data row")]
    EmptyOrMalformed,

    #[error("missing required field '{0}'")]
    MissingRequiredField(&'static str),

    #[error("invalid value '{value}' for field '{field}'")]
    InvalidField { field: &'static str, value: String },
}

impl ValidationError {
    fn status(&self) -> StatusCode {
        match self {
            ValidationError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Raw bytes could not be parsed as a supported tabular format.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unreadable workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("unreadable csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook contains no worksheets")]
    NoWorksheet,
}

/// Blob store failures. A missing blob during delete is handled by the
/// filesystem backend itself and never reaches this enum.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage upload failed for '{key}': {source}")]
    UploadFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage read failed for '{key}': {source}")]
    ReadFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage delete failed for '{key}': {source}")]
    DeleteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Relational datastore failures, tagged by the operation that failed.
#[derive(Debug, thiserror::Error)]
pub enum DatastoreError {
    #[error("datastore insert failed: {0}")]
    InsertFailed(#[source] DbErr),

    #[error("datastore update failed: {0}")]
    UpdateFailed(#[source] DbErr),

    #[error("datastore delete failed: {0}")]
    DeleteFailed(#[source] DbErr),

    #[error("datastore query failed: {0}")]
    QueryFailed(#[source] DbErr),

    #[error("{0} not found")]
    NotFound(String),
}

/// One error per import pipeline step, so a caller can always tell which
/// stage rejected the file. Steps after the first failure never run.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("import rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("import failed while decoding the spreadsheet: {0}")]
    Decode(#[from] DecodeError),

    #[error("import failed while uploading the file to storage: {0}")]
    StorageUpload(#[source] StorageError),

    #[error("import failed while recording file metadata: {0}")]
    MetadataInsert(#[source] DatastoreError),

    /// The file row and its snapshot are persisted at this point; only the
    /// derived inventory rows are missing and can be completed manually.
    #[error("file stored, but inventory rows could not be created: {0}")]
    InventoryInsert(#[source] Box<ServiceError>),
}

impl IntoResponse for ImportError {
    fn into_response(self) -> Response {
        let status = match &self {
            ImportError::Validation(v) => v.status(),
            ImportError::Decode(_) => StatusCode::BAD_REQUEST,
            ImportError::StorageUpload(_)
            | ImportError::MetadataInsert(_)
            | ImportError::InventoryInsert(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self.to_string())
    }
}

/// Umbrella error for the reconciliation and file services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Datastore(#[from] DatastoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::Validation(v) => v.status(),
            ServiceError::Datastore(DatastoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServiceError::Storage(_) | ServiceError::Datastore(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, self.to_string())
    }
}
