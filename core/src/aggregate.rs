//! Per-cell aggregation and feature derivation.
//!
//! The metadata table is the authoritative set of cells: store.rs joins the
//! three count sources against it and hands each cell's summed totals here.
//! Cells whose population proxy is zero are dropped before any feature is
//! computed — no record is ever emitted for them.

use crate::{rng::JitterRng, types::Pincode};

// ── Feature constants ────────────────────────────────────────────────────────

/// Expected biometric coverage relative to demographic registration.
pub const EXPECTED_BIOMETRIC_COVERAGE: f64 = 0.95;

/// Digital-exclusion proxy: base + slope × biometric_risk, plus jitter.
const DIGITAL_EXCLUSION_BASE: f64 = 0.3;
const DIGITAL_EXCLUSION_SLOPE: f64 = 0.4;

/// Half-width of the uniform jitter added to the digital-exclusion proxy.
const DIGITAL_EXCLUSION_JITTER: f64 = 0.05;

/// Border-proximity indicator values.
pub const BORDER_FACTOR_HIGH: f64 = 0.8;
pub const BORDER_FACTOR_LOW: f64 = 0.2;

/// Share of the population proxy assumed to be of voting age.
const ADULT_POPULATION_SHARE: f64 = 0.65;

/// Band of the multiplicative draw on the adult-registration estimate.
const REGISTRATION_ESTIMATE_LO: f64 = 0.9;
const REGISTRATION_ESTIMATE_HI: f64 = 1.1;

/// Registration-to-adult ratio above which a cell carries ghost-voter risk.
pub const OVER_REGISTRATION_THRESHOLD: f64 = 1.2;

/// States on international boundaries or otherwise treated as sensitive for
/// migration monitoring.
const BORDER_STATES: &[&str] = &[
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Gujarat",
    "Himachal Pradesh",
    "Jammu and Kashmir",
    "Ladakh",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
];

// ── Cell types ───────────────────────────────────────────────────────────────

/// Summed per-source totals for one cell, as aggregated by the store.
/// A source with no rows for the cell contributes 0, never NULL.
#[derive(Debug, Clone)]
pub struct RawCellCounts {
    pub pincode: Pincode,
    pub district: String,
    pub state: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub biometric_total: i64,
    pub demographic_total: i64,
    pub enrolment_total: i64,
}

/// Derived per-cell feature vector, pre-normalization.
#[derive(Debug, Clone)]
pub struct CellFeatureVector {
    pub counts: RawCellCounts,
    pub population: i64,
    pub migration_velocity: f64,
    pub biometric_risk: f64,
    pub digital_exclusion: f64,
    pub border_factor: f64,
    pub electoral_integrity_ratio: f64,
    pub ghost_voter_risk: bool,
}

/// Derive the feature vector for one cell.
///
/// Returns None when the population proxy is zero (silent skip, not an
/// error). Draw order from `rng` is fixed: digital-exclusion jitter first,
/// then the adult-registration estimate. Changing it changes every run.
pub fn derive_features(counts: RawCellCounts, rng: &mut JitterRng) -> Option<CellFeatureVector> {
    // Max, not sum: the three registries overlap, so summing would count
    // the same individuals more than once.
    let population = counts
        .biometric_total
        .max(counts.demographic_total)
        .max(counts.enrolment_total);
    if population == 0 {
        return None;
    }

    let pop = population as f64;
    let bio = counts.biometric_total as f64;
    let demo = counts.demographic_total as f64;
    let enrol = counts.enrolment_total as f64;

    let migration_velocity = (bio - demo).abs() / pop;

    let expected_bio = demo * EXPECTED_BIOMETRIC_COVERAGE;
    let biometric_risk = if expected_bio > 0.0 {
        ((expected_bio - bio) / expected_bio).max(0.0)
    } else {
        0.0
    };

    let jitter = rng.uniform(-DIGITAL_EXCLUSION_JITTER, DIGITAL_EXCLUSION_JITTER);
    let digital_exclusion = (DIGITAL_EXCLUSION_BASE + DIGITAL_EXCLUSION_SLOPE * biometric_risk
        + jitter)
        .clamp(0.0, 1.0);

    let border_factor = if BORDER_STATES.contains(&counts.state.as_str()) {
        BORDER_FACTOR_HIGH
    } else {
        BORDER_FACTOR_LOW
    };

    let adult_population = pop * ADULT_POPULATION_SHARE;
    let estimated_registrations =
        enrol * rng.uniform(REGISTRATION_ESTIMATE_LO, REGISTRATION_ESTIMATE_HI);
    let electoral_integrity_ratio = if adult_population > 0.0 {
        estimated_registrations / adult_population
    } else {
        0.0
    };
    let ghost_voter_risk = electoral_integrity_ratio > OVER_REGISTRATION_THRESHOLD;

    Some(CellFeatureVector {
        counts,
        population,
        migration_velocity,
        biometric_risk,
        digital_exclusion,
        border_factor,
        electoral_integrity_ratio,
        ghost_voter_risk,
    })
}
