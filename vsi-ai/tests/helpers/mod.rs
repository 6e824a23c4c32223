//! Test Helper Utilities
//!
//! Shared utilities for testing vsi-ai: a scripted inference provider and
//! builders for model responses.

#![allow(dead_code)]

pub mod log_capture;

pub use log_capture::{capture_logs, LogCapture};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use vsi_ai::models::ImageRef;
use vsi_ai::services::{
    BatchAggregator, DualPassAssessor, InferenceClient, InferenceError, InferenceProvider,
    InferenceRequest,
};
use vsi_ai::utils::RetryPolicy;

/// Which pass a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Descriptive,
    Checker,
}

type Responder = dyn Fn(Pass, &[String], usize) -> Result<String, InferenceError> + Send + Sync;

/// Inference provider driven by a closure
///
/// The closure receives the pass, the chunk's image ids and the number of
/// earlier calls made for that pass.
pub struct ScriptedProvider {
    respond: Box<Responder>,
    delay: Option<Duration>,
    descriptive_calls: AtomicUsize,
    checker_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(Pass, &[String], usize) -> Result<String, InferenceError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            delay: None,
            descriptive_calls: AtomicUsize::new(0),
            checker_calls: AtomicUsize::new(0),
        }
    }

    /// Sleep before every answer
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self, pass: Pass) -> usize {
        match pass {
            Pass::Descriptive => self.descriptive_calls.load(Ordering::SeqCst),
            Pass::Checker => self.checker_calls.load(Ordering::SeqCst),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.calls(Pass::Descriptive) + self.calls(Pass::Checker)
    }
}

#[async_trait]
impl InferenceProvider for ScriptedProvider {
    fn provider_id(&self) -> &'static str {
        "Scripted"
    }

    async fn complete(&self, request: InferenceRequest<'_>) -> Result<String, InferenceError> {
        let pass = if request.prompt.name == "checker" {
            Pass::Checker
        } else {
            Pass::Descriptive
        };
        let previous = match pass {
            Pass::Descriptive => self.descriptive_calls.fetch_add(1, Ordering::SeqCst),
            Pass::Checker => self.checker_calls.fetch_add(1, Ordering::SeqCst),
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let ids: Vec<String> = request.images.iter().map(|image| image.id.clone()).collect();
        (self.respond)(pass, &ids, previous)
    }
}

/// Aggregator over `provider` with no retries
pub fn aggregator(provider: Arc<ScriptedProvider>, chunk_size: usize) -> BatchAggregator {
    aggregator_with(provider, chunk_size, RetryPolicy::none(), Duration::from_secs(5))
}

pub fn aggregator_with(
    provider: Arc<ScriptedProvider>,
    chunk_size: usize,
    retry: RetryPolicy,
    timeout: Duration,
) -> BatchAggregator {
    let client = InferenceClient::new(provider, timeout);
    BatchAggregator::new(DualPassAssessor::new(client, retry), chunk_size)
}

/// `count` inline images named `img-00.jpg`, `img-01.jpg`, ...
pub fn images(count: usize) -> Vec<ImageRef> {
    (0..count)
        .map(|i| ImageRef::inline(format!("img-{:02}.jpg", i), vec![0xFF, 0xD8, 0xFF, i as u8]))
        .collect()
}

/// All-false tags object
pub fn no_tags() -> Value {
    json!({
        "fire_hazard": {
            "combustibles": false,
            "open_wiring": false,
            "oil_leak": false,
            "uninsulated_hot_surface": false
        },
        "trip_fall": {
            "obstructed_walkway": false,
            "blocked_passage": false,
            "broken_railing": false,
            "unmarked_pipeline": false,
            "slippery_surface": false
        },
        "rust_stains": false
    })
}

/// Descriptive entry with a plain comment and no tags
pub fn descriptive_entry(id: &str) -> Value {
    json!({
        "id": id,
        "location": "Main deck",
        "condition": "none",
        "comment": "Mooring lines coiled on the drum, deck plating dry.",
        "severity": "low",
        "recommendations": [],
        "tags": no_tags(),
        "description": "Forward mooring station with coiled lines."
    })
}

/// `{"per_image": entries}` as text
pub fn per_image(entries: Vec<Value>) -> String {
    json!({ "per_image": entries }).to_string()
}

/// Default answer: a plain descriptive entry per id, all-false checker tags
pub fn quiet_response(pass: Pass, ids: &[String]) -> String {
    match pass {
        Pass::Descriptive => per_image(ids.iter().map(|id| descriptive_entry(id)).collect()),
        Pass::Checker => per_image(
            ids.iter()
                .map(|id| json!({ "id": id, "tags": no_tags() }))
                .collect(),
        ),
    }
}
