//! Read-side privacy gate.
//!
//! Every consumer-facing query re-invokes the live suppression predicate on
//! each record before it leaves the crate. The stored is_suppressed bit
//! reflects the threshold at computation time; the one enforced here is the
//! one configured now. API layers call these functions, never the table.

use crate::{
    error::PipelineResult,
    pipeline::RiskZoneRecord,
    privacy::{GroupTotal, PrivacyPolicy},
    score::RiskLevel,
    store::ZoneStore,
};

/// Unsuppressed zones ordered by risk score, optionally filtered by level
/// and state. Rows failing the live threshold are dropped even when their
/// stored flag says released.
pub fn risk_zones(
    store: &ZoneStore,
    policy: &PrivacyPolicy,
    level: Option<RiskLevel>,
    state: Option<&str>,
    limit: usize,
) -> PipelineResult<Vec<RiskZoneRecord>> {
    let zones = store.risk_zones_filtered(level, state, limit)?;
    Ok(zones
        .into_iter()
        .filter(|z| !policy.should_suppress(z.population.unwrap_or(0)))
        .collect())
}

/// One zone by pincode, with the live threshold applied. A suppressed zone
/// comes back redacted, not hidden — suppression is a response shape, not a
/// missing record.
pub fn zone_by_pincode(
    store: &ZoneStore,
    policy: &PrivacyPolicy,
    pincode: &str,
) -> PipelineResult<Option<RiskZoneRecord>> {
    Ok(store.risk_zone_by_pincode(pincode)?.map(|mut zone| {
        policy.redact(&mut zone);
        zone
    }))
}

/// Anomalous, unsuppressed zones by descending anomaly score.
pub fn anomalies(
    store: &ZoneStore,
    policy: &PrivacyPolicy,
    limit: usize,
) -> PipelineResult<Vec<RiskZoneRecord>> {
    let zones = store.anomalous_zones(limit)?;
    Ok(zones
        .into_iter()
        .filter(|z| !policy.should_suppress(z.population.unwrap_or(0)))
        .collect())
}

/// Per-state population totals, suppressed group-wise. Only released zones
/// contribute; redacted populations are unknown by construction.
pub fn state_population_rollup(
    store: &ZoneStore,
    policy: &PrivacyPolicy,
) -> PipelineResult<Vec<GroupTotal>> {
    let rows = store.state_populations()?;
    Ok(policy.aggregate_groups(rows))
}
