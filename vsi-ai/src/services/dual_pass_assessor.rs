//! Dual-pass assessment of one chunk
//!
//! Two independent inference calls over the same images, issued concurrently:
//! - **descriptive**: full per-image record (location, comment, severity, tags)
//! - **checker**: hazard booleans only, differently worded
//!
//! Both outputs go through the resilient JSON extractor, so malformed model
//! text degrades to "no findings" instead of failing the chunk.

use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::models::{DescriptiveRecord, HazardTagSet, ImageRef};
use crate::services::inference_client::{InferenceClient, InferenceError};
use crate::services::json_extractor;
use crate::services::prompts::{SystemPrompt, CHECKER_PROMPT, DESCRIPTIVE_PROMPT};
use crate::utils::retry::{retry_transient, RetryPolicy};

/// Max characters of raw model text written to the debug log per pass
const RAW_LOG_CHARS: usize = 500;

/// Parsed result of both passes for one chunk
#[derive(Debug, Clone, Default)]
pub struct ChunkAssessment {
    /// Descriptive records in chunk input order
    pub descriptive: Vec<DescriptiveRecord>,
    /// Checker tags keyed by image id
    pub checker: HashMap<String, HazardTagSet>,
    /// Chunk ids the descriptive pass returned nothing for
    pub missing: Vec<String>,
}

pub struct DualPassAssessor {
    client: InferenceClient,
    retry: RetryPolicy,
    descriptive_max_tokens: u32,
    checker_max_tokens: u32,
}

impl DualPassAssessor {
    pub fn new(client: InferenceClient, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            descriptive_max_tokens: 2500,
            checker_max_tokens: 800,
        }
    }

    pub fn with_token_limits(mut self, descriptive: u32, checker: u32) -> Self {
        self.descriptive_max_tokens = descriptive;
        self.checker_max_tokens = checker;
        self
    }

    /// Run both passes over `chunk`
    ///
    /// # Errors
    /// The first inference failure of either pass (after retries). The other
    /// pass is abandoned.
    pub async fn assess(&self, chunk: &[ImageRef]) -> Result<ChunkAssessment, InferenceError> {
        let (descriptive_raw, checker_raw) = futures::future::try_join(
            self.run_pass(&DESCRIPTIVE_PROMPT, chunk, self.descriptive_max_tokens),
            self.run_pass(&CHECKER_PROMPT, chunk, self.checker_max_tokens),
        )
        .await?;

        let (descriptive, missing) = order_by_chunk(parse_descriptive(&descriptive_raw), chunk);
        let checker = parse_checker(&checker_raw);

        debug!(
            image_count = chunk.len(),
            descriptive_count = descriptive.len(),
            checker_count = checker.len(),
            missing_count = missing.len(),
            "Chunk passes parsed"
        );

        Ok(ChunkAssessment {
            descriptive,
            checker,
            missing,
        })
    }

    async fn run_pass(
        &self,
        prompt: &SystemPrompt,
        chunk: &[ImageRef],
        max_tokens: u32,
    ) -> Result<String, InferenceError> {
        let text = retry_transient(prompt.name, self.retry, || {
            self.client.infer(prompt, chunk, max_tokens)
        })
        .await?;

        debug!(
            pass = prompt.name,
            provider = self.client.provider_id(),
            raw = %truncate_chars(&text, RAW_LOG_CHARS),
            "Raw model output"
        );
        Ok(text)
    }
}

/// Descriptive records from raw model text (unusable entries dropped)
pub fn parse_descriptive(raw: &str) -> Vec<DescriptiveRecord> {
    let value: Value = json_extractor::extract(raw, json!({ "per_image": [] }));
    per_image_entries(&value)
        .iter()
        .filter_map(DescriptiveRecord::from_value)
        .collect()
}

/// Checker tags by id from raw model text; first entry wins on duplicate ids
pub fn parse_checker(raw: &str) -> HashMap<String, HazardTagSet> {
    let value: Value = json_extractor::extract(raw, json!({ "per_image": [] }));
    let mut checker = HashMap::new();

    for entry in per_image_entries(&value) {
        let Some(id) = entry.get("id").and_then(Value::as_str).map(str::trim) else {
            continue;
        };
        if id.is_empty() {
            continue;
        }
        checker
            .entry(id.to_string())
            .or_insert_with(|| HazardTagSet::from_value(entry.get("tags")));
    }

    checker
}

/// `per_image` array of a response; a bare top-level array is accepted too
fn per_image_entries(value: &Value) -> &[Value] {
    value
        .get("per_image")
        .and_then(Value::as_array)
        .or_else(|| value.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Reorder records to chunk order, dropping unknown and duplicate ids
///
/// Returns the ordered records and the chunk ids with no record.
fn order_by_chunk(
    records: Vec<DescriptiveRecord>,
    chunk: &[ImageRef],
) -> (Vec<DescriptiveRecord>, Vec<String>) {
    let mut by_id: HashMap<String, DescriptiveRecord> = HashMap::with_capacity(records.len());
    for record in records {
        let id = record.assessment.id.clone();
        if by_id.contains_key(&id) {
            warn!(id = %id, "Duplicate descriptive record, keeping the first");
            continue;
        }
        by_id.insert(id, record);
    }

    let mut ordered = Vec::with_capacity(chunk.len());
    let mut missing = Vec::new();
    for image in chunk {
        match by_id.remove(&image.id) {
            Some(record) => ordered.push(record),
            None => missing.push(image.id.clone()),
        }
    }

    let mut unknown: Vec<&String> = by_id.keys().collect();
    unknown.sort();
    for id in unknown {
        warn!(id = %id, "Descriptive record for an id not in this chunk, dropped");
    }

    (ordered, missing)
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
