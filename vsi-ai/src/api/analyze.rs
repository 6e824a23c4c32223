//! Photo batch analysis handler
//!
//! POST /api/analyze: multipart upload (field `photos`), one analysis run,
//! complete result or a single error.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::{
    error::{ApiError, ApiResult},
    models::RunResult,
    AppState,
};

/// Multipart field carrying photos
pub const PHOTOS_FIELD: &str = "photos";

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub id: String,
}

/// POST /api/analyze response
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub ok: bool,
    pub files: Vec<UploadedFile>,
    pub results: RunResult,
}

/// POST /api/analyze
///
/// Stores every `photos` part in the upload store, then runs the batch.
/// Returns 400 when no photo was uploaded or more than the configured maximum.
pub async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<AnalyzeResponse>> {
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(PHOTOS_FIELD) {
            continue;
        }
        if images.len() >= state.max_files {
            return Err(ApiError::BadRequest(format!(
                "Too many files (max {})",
                state.max_files
            )));
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        if bytes.is_empty() {
            tracing::warn!(file = %original_name, "Skipping empty upload");
            continue;
        }

        images.push(state.uploads.save(&original_name, &bytes).await?);
    }

    if images.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".to_string()));
    }

    tracing::info!(image_count = images.len(), "Analyze request accepted");

    match state.aggregator.run(&images).await {
        Ok(results) => Ok(Json(AnalyzeResponse {
            ok: true,
            files: images
                .into_iter()
                .map(|image| UploadedFile { id: image.id })
                .collect(),
            results,
        })),
        Err(err) => {
            tracing::error!(error = %err, "Analysis run failed");
            *state.last_error.write().await = Some(err.to_string());
            Err(err.into())
        }
    }
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/api/analyze", post(analyze))
}
