use std::sync::Arc;

use chrono::Utc;
use sea_orm::{EntityTrait, QueryOrder};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::file,
    errors::{DatastoreError, ServiceError},
    events::{Event, EventSender},
    storage::StorageBackend,
};

/// Queries and lifecycle operations on imported files. Creation happens in
/// the import pipeline; this service covers everything after.
#[derive(Clone)]
pub struct FileService {
    db: Arc<DbPool>,
    storage: Arc<dyn StorageBackend>,
    event_sender: EventSender,
}

impl FileService {
    pub fn new(
        db: Arc<DbPool>,
        storage: Arc<dyn StorageBackend>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            storage,
            event_sender,
        }
    }

    /// Imported files, newest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<file::Model>, ServiceError> {
        let files = file::Entity::find()
            .order_by_desc(file::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to list files");
                DatastoreError::QueryFailed(e)
            })?;
        Ok(files)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, file_id: Uuid) -> Result<file::Model, ServiceError> {
        self.find_existing(file_id).await
    }

    /// Public URL for the stored blob.
    #[instrument(skip(self))]
    pub async fn public_url(&self, file_id: Uuid) -> Result<String, ServiceError> {
        let file = self.find_existing(file_id).await?;
        Ok(self.storage.public_url(&file.storage_path))
    }

    /// Removes the blob and then the metadata row. Blob removal is
    /// best-effort: a missing or unremovable blob is logged and never blocks
    /// deleting the row, whose absence is authoritative for existence.
    /// Inventory items are deliberately left in place (no cascade).
    #[instrument(skip(self))]
    pub async fn delete(&self, file_id: Uuid) -> Result<(), ServiceError> {
        let file = self.find_existing(file_id).await?;

        if let Err(e) = self.storage.remove(&file.storage_path).await {
            warn!(%file_id, storage_path = %file.storage_path, error = %e,
                "blob removal failed; deleting metadata row anyway");
        }

        file::Entity::delete_by_id(file_id)
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!(%file_id, error = %e, "failed to delete file row");
                DatastoreError::DeleteFailed(e)
            })?;

        self.event_sender
            .send(Event::FileDeleted {
                file_id,
                timestamp: Utc::now(),
            })
            .await;
        info!(%file_id, "file deleted");
        Ok(())
    }

    async fn find_existing(&self, file_id: Uuid) -> Result<file::Model, ServiceError> {
        file::Entity::find_by_id(file_id)
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(%file_id, error = %e, "failed to load file");
                ServiceError::from(DatastoreError::QueryFailed(e))
            })?
            .ok_or_else(|| DatastoreError::NotFound(format!("file {}", file_id)).into())
    }
}
