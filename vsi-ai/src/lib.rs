//! vsi-ai library interface
//!
//! Hazard classification for vessel inspection photographs: two inference
//! passes per chunk, consensus fusion, and a deterministic rule engine.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{AnalysisError, ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::services::{BatchAggregator, UploadStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Analysis pipeline
    pub aggregator: Arc<BatchAggregator>,
    /// Where uploaded photos are kept
    pub uploads: Arc<UploadStore>,
    /// Maximum photos per analyze request
    pub max_files: usize,
    /// Maximum request body size
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(aggregator: BatchAggregator, uploads: UploadStore) -> Self {
        let defaults = vsi_common::config::AnalysisConfig::default();
        Self {
            aggregator: Arc::new(aggregator),
            uploads: Arc::new(uploads),
            max_files: defaults.max_files,
            max_upload_bytes: defaults.max_upload_bytes,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_limits(mut self, max_files: usize, max_upload_bytes: usize) -> Self {
        self.max_files = max_files;
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .merge(api::analyze_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
