use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use bytes::Bytes;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use inventario_api::config::AppConfig;
use inventario_api::errors::StorageError;
use inventario_api::events::{self, EventSender};
use inventario_api::services::imports::UploadedFile;
use inventario_api::storage::{FilesystemBackend, StorageBackend};
use inventario_api::{db, handlers, AppState};

/// Test harness backed by a SQLite database and a temp-dir blob store.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub storage: Arc<FilesystemBackend>,
    _dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("inventario_test.db");
        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let pool = db::establish_connection(&database_url)
            .await
            .expect("connect test database");
        db::run_migrations(&pool).await.expect("run migrations");

        let storage = Arc::new(FilesystemBackend::new(
            dir.path().join("blobs"),
            "http://localhost:8080/storage",
        ));

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let config = test_config(&database_url, dir.path().to_str().unwrap());
        let state = AppState::build(
            Arc::new(pool),
            storage.clone(),
            config,
            event_sender,
        );
        let router = handlers::app_router(state.clone());

        Self {
            state,
            router,
            storage,
            _dir: dir,
            _event_task: event_task,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    /// Sends a multipart import request the way a browser form would.
    pub async fn import_request(
        &self,
        display_name: &str,
        actor_id: Uuid,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Response {
        let boundary = "inventario-test-boundary";
        let mut body = Vec::new();
        for (field, value) in [("name", display_name), ("actor_id", &actor_id.to_string())] {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/files/import")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .expect("response body bytes")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json response")
}

pub fn csv_upload(file_name: &str, content: &str) -> UploadedFile {
    UploadedFile {
        file_name: file_name.to_string(),
        content_type: Some("text/csv".to_string()),
        bytes: Bytes::copy_from_slice(content.as_bytes()),
    }
}

fn test_config(database_url: &str, storage_root: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        storage_root: storage_root.to_string(),
        storage_public_url: "http://localhost:8080/storage".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        log_level: "debug".to_string(),
        log_json: false,
        auto_migrate: true,
        db_max_connections: 1,
        db_min_connections: 1,
    }
}

/// Storage backend that counts calls; used to prove rejected uploads never
/// reach the blob store.
#[derive(Default)]
pub struct CountingBackend {
    pub uploads: AtomicUsize,
    pub removes: AtomicUsize,
}

impl CountingBackend {
    pub fn upload_calls(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageBackend for CountingBackend {
    async fn upload(
        &self,
        _key: &str,
        _bytes: &[u8],
        _content_type: &str,
    ) -> Result<(), StorageError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        Err(StorageError::ReadFailed {
            key: key.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "counting backend"),
        })
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn exists(&self, _key: &str) -> Result<bool, StorageError> {
        Ok(false)
    }

    fn public_url(&self, key: &str) -> String {
        format!("counting://{key}")
    }
}
