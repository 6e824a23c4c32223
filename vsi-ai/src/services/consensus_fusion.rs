//! Consensus fusion of the descriptive and checker passes
//!
//! Fire and trip/fall leaves fuse with OR: either pass asserting a hazard wins.
//! Corrosion fuses with AND, and is additionally dropped unless the
//! descriptive pass's own text mentions corrosion.

use std::collections::HashMap;

use crate::models::{DescriptiveRecord, HazardTagSet};

/// Words that count as textual corrosion evidence (case-insensitive substring)
pub const CORROSION_TERMS: [&str; 5] = ["rust", "corrosion", "oxidation", "corroded", "rusted"];

/// Whether `text` mentions corrosion
pub fn has_corrosion_evidence(text: &str) -> bool {
    let lowered = text.to_lowercase();
    CORROSION_TERMS.iter().any(|term| lowered.contains(term))
}

/// Fuse one image's two tag sets
pub fn fuse_tags(descriptive: &HazardTagSet, checker: &HazardTagSet, evidence_text: &str) -> HazardTagSet {
    let rust_agreed = descriptive.rust_stains && checker.rust_stains;

    HazardTagSet {
        fire_hazard: descriptive.fire_hazard.or(checker.fire_hazard),
        trip_fall: descriptive.trip_fall.or(checker.trip_fall),
        rust_stains: rust_agreed && has_corrosion_evidence(evidence_text),
    }
}

/// Fuse checker tags into each descriptive record in place
///
/// A record with no checker entry keeps its descriptive tags unchanged.
/// Returns the number of records that had a checker match.
pub fn fuse_records(records: &mut [DescriptiveRecord], checker: &HashMap<String, HazardTagSet>) -> usize {
    let mut matched = 0;

    for record in records.iter_mut() {
        let Some(checker_tags) = checker.get(&record.assessment.id) else {
            tracing::debug!(id = %record.assessment.id, "No checker entry, keeping descriptive tags");
            continue;
        };

        let fused = fuse_tags(&record.assessment.tags, checker_tags, &record.evidence_text());
        if record.assessment.tags.rust_stains && checker_tags.rust_stains && !fused.rust_stains {
            tracing::debug!(
                id = %record.assessment.id,
                "Corrosion agreed by both passes but not mentioned in text, suppressed"
            );
        }
        record.assessment.tags = fused;
        matched += 1;
    }

    matched
}
