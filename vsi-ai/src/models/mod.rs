//! Data models for vsi-ai (hazard classification)
//!
//! - Hazard tag set and classification enums
//! - Per-image assessments and run-level results

pub mod assessment;
pub mod hazard;

pub use assessment::{BatchSummary, ContentLocator, DescriptiveRecord, ImageAssessment, ImageRef, RunResult};
pub use hazard::{Condition, FireHazardTags, HazardTagSet, Severity, TripFallTags};
