//! Minimum-cell-size privacy enforcement.
//!
//! RULE: should_suppress() is the single source of truth. It runs once at
//! computation time, to stamp the persisted record, and again on every read
//! path — the stored flag is a cache of the gate, not a replacement for it,
//! since the configured threshold can change between runs.

use crate::{config::PipelineConfig, pipeline::RiskZoneRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// Immutable suppression policy for one process lifetime. Threaded
/// explicitly into the pipeline and every read path; never a global.
#[derive(Debug, Clone, Copy)]
pub struct PrivacyPolicy {
    minimum_cell_size: i64,
}

impl PrivacyPolicy {
    pub fn new(minimum_cell_size: i64) -> Self {
        Self { minimum_cell_size }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            minimum_cell_size: config.minimum_cell_size,
        }
    }

    pub fn minimum_cell_size(&self) -> i64 {
        self.minimum_cell_size
    }

    /// True iff a statistic over `count` individuals must not be released.
    /// Boundary: a count equal to the minimum passes.
    pub fn should_suppress(&self, count: i64) -> bool {
        count < self.minimum_cell_size
    }

    /// Null every statistically sensitive field on a record that is already
    /// marked suppressed or whose count fails the live threshold.
    /// Categorical and location fields stay. Idempotent.
    pub fn redact(&self, record: &mut RiskZoneRecord) {
        let count = record.population.unwrap_or(0);
        if !record.is_suppressed && !self.should_suppress(count) {
            return;
        }
        record.population = None;
        record.calibrated_population = None;
        record.lower_ci = None;
        record.upper_ci = None;
        record.risk_score = None;
        record.migration_velocity = None;
        record.biometric_risk = None;
        record.digital_exclusion = None;
        record.electoral_integrity_ratio = None;
        record.is_suppressed = true;
        if record.suppression_reason.is_none() {
            record.suppression_reason = Some(format!(
                "Data suppressed for privacy (n={count} < {})",
                self.minimum_cell_size
            ));
        }
    }

    /// Group (key, count) rows, sum each group, and release either the true
    /// sum or a fully suppressed stub — never a partially suppressed group.
    /// Output is in key order.
    pub fn aggregate_groups<I>(&self, rows: I) -> Vec<GroupTotal>
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        let mut groups: BTreeMap<String, (i64, usize)> = BTreeMap::new();
        for (key, count) in rows {
            let entry = groups.entry(key).or_insert((0, 0));
            entry.0 += count;
            entry.1 += 1;
        }
        groups
            .into_iter()
            .map(|(key, (total, record_count))| {
                if self.should_suppress(total) {
                    GroupTotal {
                        key,
                        total: None,
                        record_count: None,
                        suppressed: true,
                        suppression_reason: Some(format!(
                            "Aggregated data suppressed (n={total} < {})",
                            self.minimum_cell_size
                        )),
                    }
                } else {
                    GroupTotal {
                        key,
                        total: Some(total),
                        record_count: Some(record_count),
                        suppressed: false,
                        suppression_reason: None,
                    }
                }
            })
            .collect()
    }
}

/// One group's privacy-safe total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    /// Sum over the group, or None when the group is suppressed.
    pub total: Option<i64>,
    /// How many records contributed; withheld on suppressed groups.
    pub record_count: Option<usize>,
    pub suppressed: bool,
    pub suppression_reason: Option<String>,
}
