//! Shared helpers for ysr-import integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;
use ysr_common::models::Role;
use ysr_import::config::ImportConfig;
use ysr_import::models::Row;
use ysr_import::services::ColumnMappingExtractor;
use ysr_import::types::{EntityKind, ExtractedBatch, ExtractionError, RecordExtractor};
use ysr_import::AppState;

pub const BOUNDARY: &str = "ysr-test-boundary";

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    pub uploads: TempDir,
}

impl TestApp {
    /// App with the deterministic column-mapping extractor
    pub async fn new() -> Self {
        Self::with_extractor(Arc::new(ColumnMappingExtractor::new())).await
    }

    pub async fn with_extractor(extractor: Arc<dyn RecordExtractor>) -> Self {
        Self::with_config(extractor, ImportConfig::default()).await
    }

    pub async fn with_config(extractor: Arc<dyn RecordExtractor>, config: ImportConfig) -> Self {
        let pool = ysr_common::db::init_memory_pool()
            .await
            .expect("Failed to create in-memory database");
        let uploads = tempfile::tempdir().expect("Failed to create uploads dir");
        let state = AppState::new(
            pool.clone(),
            extractor,
            uploads.path().to_path_buf(),
            &config,
        );

        Self {
            app: ysr_import::build_router(state),
            pool,
            uploads,
        }
    }

    /// Bearer token of a new active staff member
    pub async fn token(&self, role: Role) -> String {
        let email = format!("{}-{}@example.org", role, uuid::Uuid::new_v4());
        let (_, token) = ysr_common::db::staff::create_staff(&self.pool, "Test Staff", &email, role)
            .await
            .expect("Failed to create staff");
        token
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("Response body is not JSON")
        };
        (status, json)
    }

    /// Number of files left in the uploads directory
    pub fn upload_count(&self) -> usize {
        std::fs::read_dir(self.uploads.path()).unwrap().count()
    }
}

/// One multipart part
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(file_name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name: "file",
            file_name: Some(file_name),
            content_type: Some("text/csv"),
            data,
        }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file_name: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            ),
        }
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn import_request(uri: &str, token: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

/// Extractor that always fails like an unreachable model
pub struct FailingExtractor;

#[async_trait]
impl RecordExtractor for FailingExtractor {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn extract(
        &self,
        _rows: &[Row],
        _kind: EntityKind,
    ) -> Result<ExtractedBatch, ExtractionError> {
        Err(ExtractionError::Api {
            status: 503,
            body: "model unavailable".to_string(),
        })
    }
}

/// Extractor returning a fixed batch regardless of input
pub struct FixedExtractor(pub ExtractedBatch);

#[async_trait]
impl RecordExtractor for FixedExtractor {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn extract(
        &self,
        _rows: &[Row],
        _kind: EntityKind,
    ) -> Result<ExtractedBatch, ExtractionError> {
        Ok(self.0.clone())
    }
}
