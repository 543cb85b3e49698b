//! Inventario API
//!
//! Backend for a data-center asset dashboard. Spreadsheets are uploaded,
//! decoded into rows-of-cells, persisted (blob + metadata + JSON snapshot)
//! and reconciled into typed inventory records.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod spreadsheet;
pub mod storage;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::files::FileService;
use crate::services::imports::ImportService;
use crate::services::inventory::InventoryService;
use crate::storage::StorageBackend;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub event_sender: EventSender,
    pub imports: ImportService,
    pub files: FileService,
    pub inventory: InventoryService,
}

impl AppState {
    /// Wires the service graph over a connected pool and storage backend.
    pub fn build(
        db: Arc<DbPool>,
        storage: Arc<dyn StorageBackend>,
        config: config::AppConfig,
        event_sender: EventSender,
    ) -> Self {
        let inventory = InventoryService::new(db.clone(), event_sender.clone());
        let files = FileService::new(db.clone(), storage.clone(), event_sender.clone());
        let imports = ImportService::new(
            db.clone(),
            storage,
            inventory.clone(),
            event_sender.clone(),
        );
        Self {
            db,
            config,
            event_sender,
            imports,
            files,
            inventory,
        }
    }
}
