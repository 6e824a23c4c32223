//! Hazard tag set and classification enums
//!
//! Provider output is duck-typed JSON. Every record is normalized here into a
//! closed, fully-populated struct: a missing or malformed leaf is `false`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fire hazard leaves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireHazardTags {
    pub combustibles: bool,
    pub open_wiring: bool,
    pub oil_leak: bool,
    pub uninsulated_hot_surface: bool,
}

impl FireHazardTags {
    pub fn any(&self) -> bool {
        self.combustibles || self.open_wiring || self.oil_leak || self.uninsulated_hot_surface
    }

    /// Leaf-wise logical OR
    pub fn or(self, other: Self) -> Self {
        Self {
            combustibles: self.combustibles || other.combustibles,
            open_wiring: self.open_wiring || other.open_wiring,
            oil_leak: self.oil_leak || other.oil_leak,
            uninsulated_hot_surface: self.uninsulated_hot_surface || other.uninsulated_hot_surface,
        }
    }

    fn from_value(value: Option<&Value>) -> Self {
        Self {
            combustibles: leaf(value, "combustibles"),
            open_wiring: leaf(value, "open_wiring"),
            oil_leak: leaf(value, "oil_leak"),
            uninsulated_hot_surface: leaf(value, "uninsulated_hot_surface"),
        }
    }
}

/// Trip/fall hazard leaves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripFallTags {
    pub obstructed_walkway: bool,
    pub blocked_passage: bool,
    pub broken_railing: bool,
    pub unmarked_pipeline: bool,
    pub slippery_surface: bool,
}

impl TripFallTags {
    pub fn any(&self) -> bool {
        self.obstructed_walkway
            || self.blocked_passage
            || self.broken_railing
            || self.unmarked_pipeline
            || self.slippery_surface
    }

    /// Leaf-wise logical OR
    pub fn or(self, other: Self) -> Self {
        Self {
            obstructed_walkway: self.obstructed_walkway || other.obstructed_walkway,
            blocked_passage: self.blocked_passage || other.blocked_passage,
            broken_railing: self.broken_railing || other.broken_railing,
            unmarked_pipeline: self.unmarked_pipeline || other.unmarked_pipeline,
            slippery_surface: self.slippery_surface || other.slippery_surface,
        }
    }

    fn from_value(value: Option<&Value>) -> Self {
        Self {
            obstructed_walkway: leaf(value, "obstructed_walkway"),
            blocked_passage: leaf(value, "blocked_passage"),
            broken_railing: leaf(value, "broken_railing"),
            unmarked_pipeline: leaf(value, "unmarked_pipeline"),
            slippery_surface: leaf(value, "slippery_surface"),
        }
    }
}

/// Complete hazard tag set for one image (all ten leaves always present)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardTagSet {
    pub fire_hazard: FireHazardTags,
    pub trip_fall: TripFallTags,
    pub rust_stains: bool,
}

impl HazardTagSet {
    /// Normalize a provider `tags` object. Anything missing becomes `false`.
    pub fn from_value(value: Option<&Value>) -> Self {
        Self {
            fire_hazard: FireHazardTags::from_value(value.and_then(|v| v.get("fire_hazard"))),
            trip_fall: TripFallTags::from_value(value.and_then(|v| v.get("trip_fall"))),
            rust_stains: leaf(value, "rust_stains"),
        }
    }
}

/// Final image condition, in precedence order fire > trip > none
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "fire_hazard")]
    FireHazard,
    #[serde(rename = "trip_fall")]
    TripFall,
    #[default]
    #[serde(rename = "none")]
    NoHazard,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::FireHazard => "fire_hazard",
            Condition::TripFall => "trip_fall",
            Condition::NoHazard => "none",
        }
    }

    /// Case-insensitive parse of a provider string
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fire_hazard" | "fire" => Some(Condition::FireHazard),
            "trip_fall" | "trip" => Some(Condition::TripFall),
            "none" => Some(Condition::NoHazard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    /// Case-insensitive parse of a provider string
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }
}

/// Read a boolean leaf: JSON `true`, "true"/"yes", or a non-zero number
fn leaf(parent: Option<&Value>, key: &str) -> bool {
    match parent.and_then(|p| p.get(key)) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes")
        }
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}
