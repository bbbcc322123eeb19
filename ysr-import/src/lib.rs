//! ysr-import library interface
//!
//! Spreadsheet import service for youth-services records: uploaded
//! participant and program spreadsheets are parsed, turned into structured
//! records by an extractor, validated, and saved without duplicating
//! natural keys.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod types;

pub use crate::error::{ApiError, ApiResult, ImportError};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::{ExtractorKind, ImportConfig, OpenAiConfig};
use crate::services::{ColumnMappingExtractor, OpenAiExtractor};
use crate::types::RecordExtractor;

/// Room for multipart boundaries and the `dryRun` field on top of the file
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Turns parsed rows into candidate records
    pub extractor: Arc<dyn RecordExtractor>,
    /// Directory for request-scoped upload files
    pub uploads_dir: PathBuf,
    /// Largest accepted spreadsheet
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        extractor: Arc<dyn RecordExtractor>,
        uploads_dir: PathBuf,
        import_config: &ImportConfig,
    ) -> Self {
        Self {
            db,
            extractor,
            uploads_dir,
            max_upload_bytes: import_config.max_upload_bytes,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .merge(api::import_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Construct the configured extractor
///
/// `openai` needs an `OpenAiConfig`; `columns` ignores it.
pub fn build_extractor(
    kind: ExtractorKind,
    openai: Option<OpenAiConfig>,
) -> ysr_common::Result<Arc<dyn RecordExtractor>> {
    match kind {
        ExtractorKind::Columns => Ok(Arc::new(ColumnMappingExtractor::new())),
        ExtractorKind::OpenAi => {
            let config = openai.ok_or_else(|| {
                ysr_common::Error::Config("OpenAI extractor selected without configuration".into())
            })?;
            let extractor = OpenAiExtractor::new(config)
                .map_err(|e| ysr_common::Error::Config(e.to_string()))?;
            Ok(Arc::new(extractor))
        }
    }
}
