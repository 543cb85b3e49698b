mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use axum::http::Method;
use bytes::Bytes;
use serde_json::json;
use uuid::Uuid;

use inventario_api::errors::{ImportError, ValidationError};
use inventario_api::services::imports::{ImportService, UploadedFile, MAX_IMPORT_BYTES};
use inventario_api::storage::StorageBackend;

use common::{csv_upload, response_json, CountingBackend, TestApp};

#[tokio::test]
async fn import_persists_snapshot_and_derives_inventory() {
    let app = TestApp::new().await;
    let actor = Uuid::new_v4();

    let csv = "Name,Item Name,Installation Date,Cantidad\n\
               Sala Norte,Router A,2024-01-05,3\n\
               Sala Sur,Switch B,2024-02-10,\n";
    let outcome = app
        .state
        .imports
        .import(csv_upload("inventario_q1.csv", csv), "Acme DC", actor, true)
        .await
        .expect("import succeeds");

    assert_eq!(outcome.inventory_created, 2);
    assert_eq!(outcome.file.name, "Acme DC");
    assert_eq!(outcome.file.original_name, "inventario_q1.csv");
    assert_eq!(outcome.file.size, csv.len() as i64);
    assert_eq!(outcome.file.status, "active");

    // The stored snapshot mirrors the sheet exactly, header row included.
    let stored = app.state.files.get(outcome.file.id).await.unwrap();
    assert_eq!(
        stored.content.unwrap(),
        json!([
            ["Name", "Item Name", "Installation Date", "Cantidad"],
            ["Sala Norte", "Router A", "2024-01-05", "3"],
            ["Sala Sur", "Switch B", "2024-02-10", null]
        ])
    );

    // Blob landed under the actor-prefixed key.
    let blob = app.storage.read(&stored.storage_path).await.unwrap();
    assert_eq!(blob, csv.as_bytes());
    assert!(stored.storage_path.starts_with(&format!("{actor}/files/")));

    // Derived items went through the typed write path: quantity coerced,
    // blank quantity defaulted to 1.
    let items = app.state.inventory.list_for_file(outcome.file.id).await.unwrap();
    assert_eq!(items.len(), 2);
    let router = items.iter().find(|i| i.item_name == "Router A").unwrap();
    let switch = items.iter().find(|i| i.item_name == "Switch B").unwrap();
    assert_eq!(router.quantity, 3);
    assert_eq!(switch.quantity, 1);
    assert_eq!(router.status, "disponible");
}

#[tokio::test]
async fn two_row_sheet_round_trips_without_loss() {
    let app = TestApp::new().await;

    let outcome = app
        .state
        .imports
        .import(
            csv_upload("min.csv", "Nombre,Cantidad\nRouter A,3\n"),
            "Mínimo",
            Uuid::new_v4(),
            false,
        )
        .await
        .expect("file-only import succeeds");

    assert_eq!(outcome.inventory_created, 0);
    assert_eq!(
        outcome.file.content.unwrap(),
        json!([["Nombre", "Cantidad"], ["Router A", "3"]])
    );
}

#[tokio::test]
async fn failed_inventory_derivation_keeps_the_file() {
    let app = TestApp::new().await;

    // Headers do not carry item_name/installation_date, so derivation must
    // fail while the file itself stays persisted and queryable.
    let err = app
        .state
        .imports
        .import(
            csv_upload("min.csv", "Nombre,Cantidad\nRouter A,3\n"),
            "Degradado",
            Uuid::new_v4(),
            true,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ImportError::InventoryInsert(_));

    let files = app.state.files.list().await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "Degradado");
    assert!(app
        .state
        .inventory
        .list_for_file(files[0].id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn oversized_files_never_reach_the_blob_store() {
    let app = TestApp::new().await;
    let counting = Arc::new(CountingBackend::default());
    let imports = ImportService::new(
        app.state.db.clone(),
        counting.clone(),
        app.state.inventory.clone(),
        app.state.event_sender.clone(),
    );

    let upload = UploadedFile {
        file_name: "grande.csv".to_string(),
        content_type: Some("text/csv".to_string()),
        bytes: Bytes::from(vec![b'a'; MAX_IMPORT_BYTES + 1]),
    };
    let err = imports
        .import(upload, "Grande", Uuid::new_v4(), true)
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ImportError::Validation(ValidationError::TooLarge { .. })
    );
    assert_eq!(counting.upload_calls(), 0);
}

#[tokio::test]
async fn wrong_type_and_thin_sheets_are_rejected_before_any_side_effect() {
    let app = TestApp::new().await;
    let actor = Uuid::new_v4();

    let pdf = UploadedFile {
        file_name: "reporte.pdf".to_string(),
        content_type: Some("application/pdf".to_string()),
        bytes: Bytes::from_static(b"%PDF-1.4"),
    };
    let err = app.state.imports.import(pdf, "Reporte", actor, true).await.unwrap_err();
    assert_matches!(
        err,
        ImportError::Validation(ValidationError::InvalidType(_))
    );

    let header_only = csv_upload("solo.csv", "Nombre,Cantidad\n");
    let err = app
        .state
        .imports
        .import(header_only, "Solo", actor, true)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ImportError::Validation(ValidationError::EmptyOrMalformed)
    );

    assert!(app.state.files.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn reimporting_identical_bytes_creates_an_independent_file() {
    let app = TestApp::new().await;
    let csv = "Name,Item Name,Installation Date\nSala,Router A,2024-01-05\n";

    let first = app
        .state
        .imports
        .import(csv_upload("inv.csv", csv), "Primero", Uuid::new_v4(), true)
        .await
        .unwrap();
    let second = app
        .state
        .imports
        .import(csv_upload("inv.csv", csv), "Segundo", Uuid::new_v4(), true)
        .await
        .unwrap();

    assert_ne!(first.file.id, second.file.id);
    assert_eq!(app.state.files.list().await.unwrap().len(), 2);
    assert_eq!(first.inventory_created, 1);
    assert_eq!(second.inventory_created, 1);
}

#[tokio::test]
async fn multipart_import_over_http() {
    let app = TestApp::new().await;
    let actor = Uuid::new_v4();

    let response = app
        .import_request(
            "Sucursal Centro",
            actor,
            "centro.csv",
            "text/csv",
            b"Name,Item Name,Installation Date\nSala,Router A,2024-01-05\n",
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["file"]["name"], "Sucursal Centro");
    assert_eq!(body["inventory_created"], 1);

    let response = app.request(Method::GET, "/api/v1/files", None).await;
    assert_eq!(response.status(), 200);
    let files = response_json(response).await;
    assert_eq!(files.as_array().unwrap().len(), 1);
}
