//! Composite risk scoring.

use serde::{Deserialize, Serialize};

// Weights over the four normalized factors. Must sum to 1.0.
pub const MIGRATION_WEIGHT: f64 = 0.30;
pub const BIOMETRIC_WEIGHT: f64 = 0.35;
pub const DIGITAL_WEIGHT: f64 = 0.20;
pub const BORDER_WEIGHT: f64 = 0.15;

// Ordinal level thresholds, evaluated high to low, first match wins.
const CRITICAL_THRESHOLD: f64 = 0.75;
const HIGH_THRESHOLD: f64 = 0.55;
const MEDIUM_THRESHOLD: f64 = 0.35;

/// Weighted blend of the normalized factors. Clamped to [0, 1], not
/// rescaled — an out-of-range composite collapses to the boundary.
pub fn composite_score(migration: f64, biometric: f64, digital: f64, border: f64) -> f64 {
    let composite = MIGRATION_WEIGHT * migration
        + BIOMETRIC_WEIGHT * biometric
        + DIGITAL_WEIGHT * digital
        + BORDER_WEIGHT * border;
    composite.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= CRITICAL_THRESHOLD {
            Self::Critical
        } else if score >= HIGH_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}
