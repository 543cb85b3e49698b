use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DbErr, Set};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::file,
    errors::{DatastoreError, ImportError, ValidationError},
    events::{Event, EventSender},
    services::inventory::InventoryService,
    spreadsheet::{decode, map_records, SheetRows, SpreadsheetKind},
    storage::{storage_key, StorageBackend},
};

/// Hard ceiling on uploaded file size. Checked before decoding and before
/// any network or storage I/O.
pub const MAX_IMPORT_BYTES: usize = 10 * 1024 * 1024;

const STATUS_ACTIVE: &str = "active";

/// An upload as received from the client, before any validation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    fn extension(&self) -> Option<String> {
        let (_, ext) = self.file_name.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }
}

/// Result of a fully successful import.
#[derive(Debug)]
pub struct ImportOutcome {
    pub file: file::Model,
    pub inventory_created: u64,
}

/// Pre-I/O validation: accepted spreadsheet type, then size. Returns which
/// decoder the descriptor selects. The two-row minimum is checked after
/// decoding, in the orchestrator.
pub fn validate_upload(upload: &UploadedFile) -> Result<SpreadsheetKind, ValidationError> {
    let kind = detect_kind(upload).ok_or_else(|| {
        ValidationError::InvalidType(
            upload
                .content_type
                .clone()
                .unwrap_or_else(|| upload.file_name.clone()),
        )
    })?;

    if upload.bytes.len() > MAX_IMPORT_BYTES {
        return Err(ValidationError::TooLarge {
            size: upload.bytes.len(),
            limit: MAX_IMPORT_BYTES,
        });
    }

    Ok(kind)
}

fn detect_kind(upload: &UploadedFile) -> Option<SpreadsheetKind> {
    if let Some(ext) = upload.extension() {
        match ext.as_str() {
            "xlsx" | "xls" | "xlsb" | "ods" => return Some(SpreadsheetKind::Workbook),
            "csv" => return Some(SpreadsheetKind::Csv),
            _ => {}
        }
    }
    match upload.content_type.as_deref() {
        Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
        | Some("application/vnd.ms-excel")
        | Some("application/vnd.ms-excel.sheet.binary.macroenabled.12")
        | Some("application/vnd.oasis.opendocument.spreadsheet") => {
            Some(SpreadsheetKind::Workbook)
        }
        Some("text/csv") | Some("application/csv") => Some(SpreadsheetKind::Csv),
        _ => None,
    }
}

/// Owns the end-to-end import sequence: validate, decode, persist the blob,
/// persist the metadata row with the decoded snapshot, then derive inventory
/// rows. Each step's failure aborts the rest with a step-specific error and
/// no compensating rollback of completed steps.
#[derive(Clone)]
pub struct ImportService {
    db: Arc<DbPool>,
    storage: Arc<dyn StorageBackend>,
    inventory: InventoryService,
    event_sender: EventSender,
}

impl ImportService {
    pub fn new(
        db: Arc<DbPool>,
        storage: Arc<dyn StorageBackend>,
        inventory: InventoryService,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            storage,
            inventory,
            event_sender,
        }
    }

    /// Imports one spreadsheet on behalf of `actor_id`.
    ///
    /// Re-importing identical bytes creates an entirely independent file and
    /// inventory set; there is no de-duplication by content hash. When
    /// `derive_inventory` is false the pipeline stops after persisting the
    /// file, leaving inventory to be entered manually.
    #[instrument(
        skip(self, upload),
        fields(file_name = %upload.file_name, size = upload.bytes.len(), %actor_id)
    )]
    pub async fn import(
        &self,
        upload: UploadedFile,
        display_name: &str,
        actor_id: Uuid,
        derive_inventory: bool,
    ) -> Result<ImportOutcome, ImportError> {
        // Step 1: cheap metadata checks, before any decode or I/O.
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ValidationError::MissingRequiredField("name").into());
        }
        let kind = validate_upload(&upload)?;

        // Step 2: decode, then the minimum-content check.
        let rows = decode(&upload.bytes, kind)?;
        if rows.len() < 2 {
            return Err(ValidationError::EmptyOrMalformed.into());
        }

        // Step 3: persist the blob. Nothing references it yet, so a failure
        // here leaves no partial state at all.
        let key = storage_key(actor_id, &upload.file_name);
        let content_type = upload
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        self.storage
            .upload(&key, &upload.bytes, &content_type)
            .await
            .map_err(|e| {
                error!(key, error = %e, "blob upload failed");
                ImportError::StorageUpload(e)
            })?;

        // Step 4: metadata row with the full decoded snapshot. A failure
        // here orphans the blob just uploaded; that is accepted as a
        // garbage-collectable inconsistency rather than unwound.
        let file = self
            .insert_file_row(display_name, &upload, content_type, key, &rows)
            .await?;

        // Step 5: derived inventory. The file row stays persisted and
        // queryable even when this step fails; inventory can be completed
        // manually afterwards.
        let inventory_created = if derive_inventory {
            let records = map_records(&rows);
            self.inventory
                .create_from_records(file.id, &records, actor_id)
                .await
                .map_err(|e| ImportError::InventoryInsert(Box::new(e)))?
        } else {
            0
        };

        self.event_sender
            .send(Event::FileImported {
                file_id: file.id,
                actor_id,
                inventory_rows: inventory_created,
                timestamp: Utc::now(),
            })
            .await;
        info!(file_id = %file.id, inventory_created, "import complete");

        Ok(ImportOutcome {
            file,
            inventory_created,
        })
    }

    async fn insert_file_row(
        &self,
        display_name: &str,
        upload: &UploadedFile,
        content_type: String,
        storage_path: String,
        rows: &SheetRows,
    ) -> Result<file::Model, ImportError> {
        let snapshot = serde_json::to_value(rows)
            .map_err(|e| ImportError::MetadataInsert(DatastoreError::InsertFailed(
                DbErr::Json(e.to_string()),
            )))?;

        let active = file::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(display_name.to_string()),
            original_name: Set(upload.file_name.clone()),
            size: Set(upload.bytes.len() as i64),
            content_type: Set(content_type),
            storage_path: Set(storage_path),
            content: Set(Some(snapshot)),
            status: Set(STATUS_ACTIVE.to_string()),
            created_at: Set(Utc::now()),
        };

        active.insert(&*self.db).await.map_err(|e| {
            error!(error = %e, "file metadata insert failed");
            ImportError::MetadataInsert(DatastoreError::InsertFailed(e))
        })
    }
}
