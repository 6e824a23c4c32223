//! Classification rule engine
//!
//! Derives condition, severity, recommendations and comment from fused tags.
//! Pure and deterministic: the provider's own condition, severity and
//! recommendations are never trusted. Applying it twice gives the same result.

use crate::models::{Condition, HazardTagSet, ImageAssessment, Severity};

/// Phrases that mark a comment as generic wherever they appear (lowercase)
const BANNED_COMMENT_PHRASES: [&str; 2] = ["appears orderly", "no observable"];

/// Comments that are generic only when they are the whole comment
const GENERIC_WHOLE_COMMENTS: [&str; 5] = [
    "looks fine",
    "looks fine overall",
    "no visible hazards",
    "no issues visible",
    "nothing to report",
];

const FIRE_COMMENT: &str = "Fire hazard noted; check and correct as per safety rules.";
const TRIP_COMMENT: &str = "Trip/fall hazard noted; remove obstruction or repair railing.";
const RUST_COMMENT: &str = "Rust observed; schedule cleaning or derusting.";
const TIDY_COMMENT: &str = "Area appears tidy with clear walk path and safe stowage.";

const REC_COMBUSTIBLES: &str = "Remove combustibles or garbage from the area.";
const REC_OPEN_WIRING: &str = "Repair exposed wiring and restore insulation.";
const REC_OIL_LEAK: &str = "Stop the oil leak, clean the spill and repair the source.";
const REC_HOT_SURFACE: &str = "Install or repair insulation on hot surfaces.";
const REC_OBSTRUCTED_WALKWAY: &str = "Remove obstruction to clear the walkway.";
const REC_BLOCKED_PASSAGE: &str = "Unblock passage to ensure safe access.";
const REC_BROKEN_RAILING: &str = "Repair or replace the broken railing.";
const REC_UNMARKED_PIPELINE: &str = "Mark pipelines crossing the walkway.";
const REC_SLIPPERY_SURFACE: &str = "Clean or treat the slippery surface.";
const REC_DERUST: &str = "Derust affected surfaces by chemical or mechanical means (hydroblaster, pneumatic tools).";

/// Rule engine output for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub condition: Condition,
    pub severity: Severity,
    pub recommendations: Vec<String>,
    pub comment: String,
}

/// Classify fused tags
///
/// `asserted_severity` is what the descriptive pass claimed; it only matters
/// for trip/fall, where `High` is kept and anything else floors at `Medium`.
/// `comment` is kept unless empty or generic.
pub fn classify(tags: &HazardTagSet, asserted_severity: Severity, comment: &str) -> Classification {
    let fire = &tags.fire_hazard;
    let trip = &tags.trip_fall;
    let any_fire = fire.any();
    let any_trip = trip.any();
    let rust = tags.rust_stains;

    let condition = if any_fire {
        Condition::FireHazard
    } else if any_trip {
        Condition::TripFall
    } else {
        Condition::NoHazard
    };

    let severity = match condition {
        Condition::FireHazard => {
            if fire.open_wiring || fire.oil_leak || fire.uninsulated_hot_surface {
                Severity::High
            } else {
                Severity::Medium
            }
        }
        Condition::TripFall => {
            if asserted_severity == Severity::High {
                Severity::High
            } else {
                Severity::Medium
            }
        }
        // Corrosion alone never raises severity
        Condition::NoHazard => Severity::Low,
    };

    let recommendations = [
        (fire.combustibles, REC_COMBUSTIBLES),
        (fire.open_wiring, REC_OPEN_WIRING),
        (fire.oil_leak, REC_OIL_LEAK),
        (fire.uninsulated_hot_surface, REC_HOT_SURFACE),
        (trip.obstructed_walkway, REC_OBSTRUCTED_WALKWAY),
        (trip.blocked_passage, REC_BLOCKED_PASSAGE),
        (trip.broken_railing, REC_BROKEN_RAILING),
        (trip.unmarked_pipeline, REC_UNMARKED_PIPELINE),
        (trip.slippery_surface, REC_SLIPPERY_SURFACE),
        (rust, REC_DERUST),
    ]
    .into_iter()
    .filter(|(present, _)| *present)
    .map(|(_, text)| text.to_string())
    .collect();

    let comment = if is_generic_comment(comment) {
        let fallback = if any_fire {
            FIRE_COMMENT
        } else if any_trip {
            TRIP_COMMENT
        } else if rust {
            RUST_COMMENT
        } else {
            TIDY_COMMENT
        };
        fallback.to_string()
    } else {
        comment.to_string()
    };

    Classification {
        condition,
        severity,
        recommendations,
        comment,
    }
}

/// Overwrite the derived fields of `assessment` from its tags
pub fn apply(assessment: &mut ImageAssessment) {
    let classification = classify(&assessment.tags, assessment.severity, &assessment.comment);
    assessment.condition = classification.condition;
    assessment.severity = classification.severity;
    assessment.recommendations = classification.recommendations;
    assessment.comment = classification.comment;
}

/// Empty, containing a banned phrase, or nothing but a stock phrase
fn is_generic_comment(comment: &str) -> bool {
    let lowered = comment.to_lowercase();
    let normalized = lowered
        .trim()
        .trim_end_matches(['.', '!'])
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    normalized.is_empty()
        || BANNED_COMMENT_PHRASES.iter().any(|p| normalized.contains(p))
        || GENERIC_WHOLE_COMMENTS.contains(&normalized.as_str())
}
