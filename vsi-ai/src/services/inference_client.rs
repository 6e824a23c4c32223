//! Inference client adapter
//!
//! The only seam to the external vision-inference provider. One `infer` call
//! is one provider request, bounded by a hard timeout. Retries are decided by
//! the caller (see `utils::retry`).

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::ImageRef;
use crate::services::prompts::SystemPrompt;

/// Inference failures
///
/// `Timeout` is an inference timeout; every other variant is a provider-side
/// or transport failure.
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("Inference timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Provider error {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Image {id} unavailable: {reason}")]
    ImageUnavailable { id: String, reason: String },
}

impl InferenceError {
    /// Whether repeating the identical call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            InferenceError::Timeout(_) | InferenceError::Transport(_) => true,
            InferenceError::Provider { status, .. } => *status == 429 || *status >= 500,
            InferenceError::ImageUnavailable { .. } => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, InferenceError::Timeout(_))
    }
}

/// One provider request
#[derive(Debug, Clone, Copy)]
pub struct InferenceRequest<'a> {
    pub prompt: &'a SystemPrompt,
    pub images: &'a [ImageRef],
    pub max_output_tokens: u32,
}

/// Vision-inference provider
///
/// Implementations send the system prompt, the instruction text and every
/// image (each labelled with its id) and return the model's raw text.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Provider identifier for logging
    fn provider_id(&self) -> &'static str;

    async fn complete(&self, request: InferenceRequest<'_>) -> Result<String, InferenceError>;
}

/// Timeout-bounded wrapper around a provider
#[derive(Clone)]
pub struct InferenceClient {
    provider: Arc<dyn InferenceProvider>,
    timeout: Duration,
}

impl InferenceClient {
    pub fn new(provider: Arc<dyn InferenceProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn provider_id(&self) -> &'static str {
        self.provider.provider_id()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue one inference call
    ///
    /// # Errors
    /// `InferenceError::Timeout` if the bound elapses (the call is abandoned),
    /// otherwise whatever the provider reports.
    pub async fn infer(
        &self,
        prompt: &SystemPrompt,
        images: &[ImageRef],
        max_output_tokens: u32,
    ) -> Result<String, InferenceError> {
        let request = InferenceRequest {
            prompt,
            images,
            max_output_tokens,
        };

        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    provider = self.provider.provider_id(),
                    pass = prompt.name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    image_count = images.len(),
                    "Inference call abandoned after timeout"
                );
                Err(InferenceError::Timeout(self.timeout))
            }
        }
    }
}
