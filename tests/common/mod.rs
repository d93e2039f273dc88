#![allow(dead_code)]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use school_directory::db::SchoolStore;
use school_directory::router::{DirectoryState, directory_router};
use school_directory::storage::{LocalImageStorage, MemoryImageStorage, SharedImageStorage};
use school_directory::SchoolService;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "----school-directory-test-boundary";
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub struct TestApp {
    pub dir: TempDir,
    pub store: SchoolStore,
    pub memory: Option<Arc<MemoryImageStorage>>,
    pub router: Router,
}

pub async fn temp_store(dir: &TempDir) -> SchoolStore {
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("schools.db").display()
    );
    SchoolStore::connect(&url, 4, Duration::from_secs(5))
        .await
        .expect("failed to open sqlite store")
}

fn build(store: SchoolStore, storage: SharedImageStorage, require_location: bool) -> DirectoryState {
    DirectoryState::new(SchoolService::new(
        store,
        storage,
        MAX_IMAGE_BYTES,
        require_location,
    ))
}

/// Router backed by the in-memory image store.
pub async fn memory_app(require_location: bool) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = temp_store(&dir).await;
    let memory = Arc::new(MemoryImageStorage::new());
    let state = build(store.clone(), memory.clone(), require_location);
    TestApp {
        dir,
        store,
        memory: Some(memory),
        router: directory_router(state),
    }
}

/// Router writing images to a temp directory and serving them under `/uploads`.
pub async fn local_app() -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = temp_store(&dir).await;
    let local = LocalImageStorage::new(dir.path().join("uploads"), "/uploads".to_string());
    let state = build(store.clone(), Arc::new(local.clone()), true).with_local_uploads(local);
    TestApp {
        dir,
        store,
        memory: None,
        router: directory_router(state),
    }
}

pub struct FilePart<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

pub fn multipart_body(fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.file_name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn lincoln_high() -> Vec<(&'static str, &'static str)> {
    vec![
        ("name", "Lincoln High"),
        ("address", "1 School Rd"),
        ("city", "Springfield"),
        ("state", "IL"),
        ("contact", "555-0100"),
        ("email_id", "office@lincoln.example"),
    ]
}

pub async fn post_school(router: &Router, body: Vec<u8>) -> (StatusCode, Value) {
    let resp = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/schools")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    read_json(resp).await
}

pub async fn get(router: &Router, uri: &str) -> axum::response::Response {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed")
}

pub async fn list_schools(router: &Router) -> (StatusCode, Value) {
    read_json(get(router, "/api/schools").await).await
}

pub async fn read_json(resp: axum::response::Response) -> (StatusCode, Value) {
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let value = serde_json::from_slice(&body).expect("response body was not json");
    (status, value)
}
