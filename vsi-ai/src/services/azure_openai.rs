//! Azure OpenAI chat-completions provider
//!
//! Sends each image as a base64 data URL preceded by an `id: <id>` text part,
//! with deterministic sampling (temperature 0, narrow top_p).

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

use crate::services::inference_client::{InferenceError, InferenceProvider, InferenceRequest};

const USER_AGENT: &str = concat!("vsi-ai/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection and sampling settings
#[derive(Debug, Clone)]
pub struct AzureOpenAiSettings {
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
    pub api_key: String,
    pub temperature: f32,
    pub top_p: f32,
    pub requests_per_second: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct AzureOpenAiProvider {
    http_client: reqwest::Client,
    url: String,
    api_key: String,
    temperature: f32,
    top_p: f32,
    rate_limiter: Option<
        governor::RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl AzureOpenAiProvider {
    pub fn new(settings: AzureOpenAiSettings) -> Result<Self, InferenceError> {
        // The adapter's own timeout bounds the whole call; only connect is bounded here
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        let rate_limiter = settings
            .requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| governor::RateLimiter::direct(governor::Quota::per_second(rps)));

        Ok(Self {
            http_client,
            url: completions_url(&settings),
            api_key: settings.api_key,
            temperature: settings.temperature,
            top_p: settings.top_p,
            rate_limiter,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl InferenceProvider for AzureOpenAiProvider {
    fn provider_id(&self) -> &'static str {
        "AzureOpenAI"
    }

    async fn complete(&self, request: InferenceRequest<'_>) -> Result<String, InferenceError> {
        let user_content = build_user_content(&request).await?;

        let body = json!({
            "messages": [
                { "role": "system", "content": request.prompt.system },
                { "role": "user", "content": user_content },
            ],
            "temperature": self.temperature,
            "top_p": self.top_p,
            "max_tokens": request.max_output_tokens,
        });

        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        debug!(
            pass = request.prompt.name,
            image_count = request.images.len(),
            max_tokens = request.max_output_tokens,
            "Sending chat completion request"
        );

        let response = self
            .http_client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(InferenceError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            InferenceError::Provider {
                status: status.as_u16(),
                message: format!("unreadable completion body: {}", e),
            }
        })?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_else(|| "{}".to_string()))
    }
}

/// `<endpoint>/openai/deployments/<deployment>/chat/completions?api-version=<v>`
fn completions_url(settings: &AzureOpenAiSettings) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        settings.endpoint.trim_end_matches('/'),
        settings.deployment,
        settings.api_version
    )
}

/// Instruction text, then `id:` label and image part for every image
async fn build_user_content(request: &InferenceRequest<'_>) -> Result<Vec<Value>, InferenceError> {
    let mut content = Vec::with_capacity(1 + request.images.len() * 2);
    content.push(json!({ "type": "text", "text": request.prompt.instruction }));

    for image in request.images {
        let bytes = image
            .load_bytes()
            .await
            .map_err(|e| InferenceError::ImageUnavailable {
                id: image.id.clone(),
                reason: e.to_string(),
            })?;

        content.push(json!({ "type": "text", "text": format!("id: {}", image.id) }));
        content.push(json!({
            "type": "image_url",
            "image_url": { "url": to_data_url(&bytes), "detail": "high" },
        }));
    }

    Ok(content)
}

/// Encode bytes as a data URL, sniffing the MIME type from content
pub fn to_data_url(bytes: &[u8]) -> String {
    let mime = infer::get(bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
