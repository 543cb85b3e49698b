mod common;

use assert_matches::assert_matches;
use axum::http::Method;
use uuid::Uuid;

use inventario_api::errors::{DatastoreError, ServiceError};
use inventario_api::storage::StorageBackend;

use common::{csv_upload, response_json, TestApp};

const FULL_SHEET: &str = "Name,Item Name,Installation Date\nSala,Router A,2024-01-05\n";

#[tokio::test]
async fn delete_removes_blob_and_row() {
    let app = TestApp::new().await;

    let outcome = app
        .state
        .imports
        .import(csv_upload("inv.csv", FULL_SHEET), "Con Blob", Uuid::new_v4(), false)
        .await
        .unwrap();
    let storage_path = outcome.file.storage_path.clone();
    assert!(app.storage.exists(&storage_path).await.unwrap());

    app.state.files.delete(outcome.file.id).await.unwrap();

    assert!(!app.storage.exists(&storage_path).await.unwrap());
    let err = app.state.files.get(outcome.file.id).await.unwrap_err();
    assert_matches!(err, ServiceError::Datastore(DatastoreError::NotFound(_)));
}

#[tokio::test]
async fn delete_succeeds_when_the_blob_is_already_gone() {
    let app = TestApp::new().await;

    let outcome = app
        .state
        .imports
        .import(csv_upload("inv.csv", FULL_SHEET), "Sin Blob", Uuid::new_v4(), false)
        .await
        .unwrap();

    // Simulate an operator removing the object directly from storage.
    app.storage.remove(&outcome.file.storage_path).await.unwrap();

    app.state
        .files
        .delete(outcome.file.id)
        .await
        .expect("missing blob must not block the row delete");
    assert!(app.state.files.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_file_leaves_its_inventory_queryable() {
    let app = TestApp::new().await;

    let outcome = app
        .state
        .imports
        .import(csv_upload("inv.csv", FULL_SHEET), "Con Items", Uuid::new_v4(), true)
        .await
        .unwrap();
    assert_eq!(outcome.inventory_created, 1);
    let file_id = outcome.file.id;

    app.state.files.delete(file_id).await.unwrap();

    // No cascade: the orphaned item is still there, reachable by file id.
    let orphans = app.state.inventory.list_for_file(file_id).await.unwrap();
    assert_eq!(orphans.len(), 1);

    // The explicit maintenance operation is what removes orphans.
    let purged = app.state.inventory.purge_orphaned_items().await.unwrap();
    assert_eq!(purged, 1);
    assert!(app
        .state
        .inventory
        .list_for_file(file_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn purge_keeps_items_whose_parent_still_exists() {
    let app = TestApp::new().await;

    let kept = app
        .state
        .imports
        .import(csv_upload("a.csv", FULL_SHEET), "Vivo", Uuid::new_v4(), true)
        .await
        .unwrap();
    let doomed = app
        .state
        .imports
        .import(csv_upload("b.csv", FULL_SHEET), "Borrado", Uuid::new_v4(), true)
        .await
        .unwrap();

    app.state.files.delete(doomed.file.id).await.unwrap();
    let purged = app.state.inventory.purge_orphaned_items().await.unwrap();
    assert_eq!(purged, 1);
    assert_eq!(
        app.state
            .inventory
            .list_for_file(kept.file.id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn file_endpoints_over_http() {
    let app = TestApp::new().await;

    let outcome = app
        .state
        .imports
        .import(csv_upload("inv.csv", FULL_SHEET), "HTTP", Uuid::new_v4(), false)
        .await
        .unwrap();
    let id = outcome.file.id;

    let response = app.request(Method::GET, &format!("/api/v1/files/{id}"), None).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["name"], "HTTP");

    let response = app
        .request(Method::GET, &format!("/api/v1/files/{id}/url"), None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert!(body["url"]
        .as_str()
        .unwrap()
        .starts_with("http://localhost:8080/storage/"));

    let response = app
        .request(Method::DELETE, &format!("/api/v1/files/{id}"), None)
        .await;
    assert_eq!(response.status(), 204);

    let response = app.request(Method::GET, &format!("/api/v1/files/{id}"), None).await;
    assert_eq!(response.status(), 404);

    let unknown = Uuid::new_v4();
    let response = app
        .request(Method::DELETE, &format!("/api/v1/files/{unknown}"), None)
        .await;
    assert_eq!(response.status(), 404);
}
