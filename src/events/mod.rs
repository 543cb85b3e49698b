use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted after successful writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    FileImported {
        file_id: Uuid,
        actor_id: Uuid,
        inventory_rows: u64,
        timestamp: DateTime<Utc>,
    },
    FileDeleted {
        file_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    InventoryItemCreated(Uuid),
    InventoryItemUpdated(Uuid),
    InventoryItemDeleted(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, logging on failure. Event delivery is advisory and
    /// never fails the write that produced it.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("event channel closed, dropping event: {}", e);
        }
    }
}

/// Consumes the event stream and logs it. Runs as a spawned task for the
/// lifetime of the server.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::FileImported {
                file_id,
                actor_id,
                inventory_rows,
                ..
            } => {
                info!(%file_id, %actor_id, inventory_rows, "file imported");
            }
            Event::FileDeleted { file_id, .. } => info!(%file_id, "file deleted"),
            Event::InventoryItemCreated(id) => info!(item_id = %id, "inventory item created"),
            Event::InventoryItemUpdated(id) => info!(item_id = %id, "inventory item updated"),
            Event::InventoryItemDeleted(id) => info!(item_id = %id, "inventory item deleted"),
        }
    }
}
