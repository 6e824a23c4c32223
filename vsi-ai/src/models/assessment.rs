//! Per-image assessment and run-level result types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::hazard::{Condition, HazardTagSet, Severity};

/// Where an image's bytes live
#[derive(Debug, Clone)]
pub enum ContentLocator {
    /// File in the upload store
    File(PathBuf),
    /// Bytes held in memory
    Inline(Arc<[u8]>),
}

/// Reference to one photograph in a run
///
/// `id` is unique within a run and is the key the provider echoes back.
#[derive(Debug, Clone)]
pub struct ImageRef {
    pub id: String,
    pub locator: ContentLocator,
}

impl ImageRef {
    pub fn from_file(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            locator: ContentLocator::File(path.into()),
        }
    }

    pub fn inline(id: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id: id.into(),
            locator: ContentLocator::Inline(bytes.into()),
        }
    }

    /// File references keyed by file name
    ///
    /// A name already taken earlier in `paths` gets its input position as a
    /// prefix (`3-IMG_1.jpg`), so every id in the result is distinct.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Vec<Self> {
        let mut taken = HashSet::with_capacity(paths.len());

        paths
            .iter()
            .enumerate()
            .map(|(index, path)| {
                let path = path.as_ref();
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());

                let mut id = name.clone();
                let mut prefix = index;
                while taken.contains(&id) {
                    id = format!("{}-{}", prefix, name);
                    prefix += 1;
                }
                taken.insert(id.clone());

                Self::from_file(id, path)
            })
            .collect()
    }

    /// Resolve the locator to raw bytes
    pub async fn load_bytes(&self) -> std::io::Result<Vec<u8>> {
        match &self.locator {
            ContentLocator::File(path) => tokio::fs::read(path).await,
            ContentLocator::Inline(bytes) => Ok(bytes.to_vec()),
        }
    }
}

/// Hazard assessment for one image
///
/// `condition`, `severity`, `recommendations` and `comment` are overwritten by
/// the rule engine; only `tags` (after fusion) are taken from the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAssessment {
    pub id: String,
    #[serde(default)]
    pub location: String,
    pub condition: Condition,
    pub comment: String,
    pub severity: Severity,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub tags: HazardTagSet,
}

/// Raw descriptive-pass record: the assessment plus free-text evidence
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveRecord {
    pub assessment: ImageAssessment,
    /// Optional longer description some responses carry alongside `comment`
    pub description: String,
}

impl DescriptiveRecord {
    /// Normalize one `per_image` entry. Returns `None` when it has no usable id.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = value.get("id")?.as_str()?.trim();
        if id.is_empty() {
            return None;
        }

        let recommendations = value
            .get("recommendations")
            .or_else(|| value.get("recommendations_high_severity_only"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            assessment: ImageAssessment {
                id: id.to_string(),
                location: text_field(value, "location"),
                condition: value
                    .get("condition")
                    .and_then(Value::as_str)
                    .and_then(Condition::parse_lenient)
                    .unwrap_or_default(),
                comment: text_field(value, "comment"),
                severity: value
                    .get("severity")
                    .and_then(Value::as_str)
                    .and_then(Severity::parse_lenient)
                    .unwrap_or_default(),
                recommendations,
                tags: HazardTagSet::from_value(value.get("tags")),
            },
            description: text_field(value, "description"),
        })
    }

    /// Text searched for corrosion vocabulary
    pub fn evidence_text(&self) -> String {
        format!("{} {}", self.assessment.comment, self.description)
    }
}

fn text_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Per-condition counts for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub fire_hazard_count: usize,
    pub trip_fall_count: usize,
    pub none_count: usize,
}

impl BatchSummary {
    /// Count one finished assessment
    pub fn record(&mut self, condition: Condition) {
        match condition {
            Condition::FireHazard => self.fire_hazard_count += 1,
            Condition::TripFall => self.trip_fall_count += 1,
            Condition::NoHazard => self.none_count += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.fire_hazard_count + self.trip_fall_count + self.none_count
    }
}

/// Externally visible output of one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub summary: BatchSummary,
    /// Input order: chunk order, then order within the chunk
    pub assessments: Vec<ImageAssessment>,
    /// Input ids the descriptive pass returned nothing for
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unassessed: Vec<String>,
}
