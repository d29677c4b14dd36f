//! The batch pipeline — aggregate, normalize, score, detect, suppress,
//! persist.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Aggregate raw counts for every metadata cell (store query).
//!   2. Derive per-cell features, skipping zero-population cells.
//!   3. Normalize each feature over the whole batch:
//!        min-max    → composite scoring
//!        modified z → anomaly detection
//!   4. Score, level, and anomaly-flag each cell.
//!   5. Apply the privacy gate at computation time.
//!   6. Replace the risk_zones table atomically.
//!
//! RULES:
//!   - Single-threaded, single pass. The full batch stays in memory across
//!     normalization: both strategies need every value before any result.
//!   - All randomness flows through the JitterRng built from the run seed.
//!   - The pipeline is the sole writer of risk_zones.

use crate::{
    aggregate::{self, CellFeatureVector},
    anomaly,
    error::PipelineResult,
    normalize,
    privacy::PrivacyPolicy,
    rng::JitterRng,
    score::{self, RiskLevel},
    store::ZoneStore,
    types::{Pincode, RunId},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fay-Herriot-style shrinkage applied to the raw population proxy.
const POPULATION_CALIBRATION: f64 = 0.98;

/// Confidence-interval bounds around the calibrated population.
const CI_LOWER: f64 = 0.95;
const CI_UPPER: f64 = 1.05;

/// One persisted row of the risk_zones table. Option fields are the
/// statistically sensitive ones: all None on a suppressed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskZoneRecord {
    pub pincode: Pincode,
    pub district: String,
    pub state: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub population: Option<i64>,
    pub calibrated_population: Option<i64>,
    pub lower_ci: Option<i64>,
    pub upper_ci: Option<i64>,
    pub risk_score: Option<f64>,
    pub risk_level: RiskLevel,
    pub migration_velocity: Option<f64>,
    pub biometric_risk: Option<f64>,
    pub digital_exclusion: Option<f64>,
    pub electoral_integrity_ratio: Option<f64>,
    pub ghost_voter_risk: bool,
    pub anomaly_flag: bool,
    pub anomaly_score: f64,
    pub is_suppressed: bool,
    pub suppression_reason: Option<String>,
    pub computed_at: String,
}

/// End-of-run accounting, persisted to pipeline_run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub seed: u64,
    pub minimum_cell_size: i64,
    pub cells_seen: usize,
    pub cells_scored: usize,
    pub cells_suppressed: usize,
    pub anomaly_count: usize,
    pub started_at: String,
    pub finished_at: String,
}

/// Run one complete pipeline pass.
///
/// Either every record commits or none does; a failure mid-replacement
/// leaves the prior record set intact. Retry is the caller's concern.
pub fn run(store: &mut ZoneStore, policy: PrivacyPolicy, seed: u64) -> PipelineResult<RunSummary> {
    let run_id = format!("run-{}", Uuid::new_v4());
    let started_at = Utc::now().to_rfc3339();
    log::info!(
        "Pipeline {run_id} starting (seed {seed}, minimum cell size {})",
        policy.minimum_cell_size()
    );

    let raw = store.cell_counts()?;
    let cells_seen = raw.len();

    let mut rng = JitterRng::new(seed);
    let cells: Vec<CellFeatureVector> = raw
        .into_iter()
        .filter_map(|counts| aggregate::derive_features(counts, &mut rng))
        .collect();

    if cells.is_empty() {
        log::warn!("Pipeline {run_id}: no cells with nonzero population, table left untouched");
        let summary = RunSummary {
            run_id,
            seed,
            minimum_cell_size: policy.minimum_cell_size(),
            cells_seen,
            cells_scored: 0,
            cells_suppressed: 0,
            anomaly_count: 0,
            started_at,
            finished_at: Utc::now().to_rfc3339(),
        };
        store.insert_pipeline_run(&summary)?;
        return Ok(summary);
    }

    // Full-batch feature columns. Both normalization strategies are
    // batch-relative, so no cell can be scored until all are aggregated.
    let migration: Vec<f64> = cells.iter().map(|c| c.migration_velocity).collect();
    let biometric: Vec<f64> = cells.iter().map(|c| c.biometric_risk).collect();
    let digital: Vec<f64> = cells.iter().map(|c| c.digital_exclusion).collect();
    let border: Vec<f64> = cells.iter().map(|c| c.border_factor).collect();

    let migration_mm = normalize::min_max(&migration);
    let biometric_mm = normalize::min_max(&biometric);
    let digital_mm = normalize::min_max(&digital);
    let border_mm = normalize::min_max(&border);

    let migration_z = normalize::modified_z_scores(&migration);
    let biometric_z = normalize::modified_z_scores(&biometric);

    let computed_at = Utc::now().to_rfc3339();
    let mut cells_suppressed = 0usize;
    let mut anomaly_count = 0usize;

    let records: Vec<RiskZoneRecord> = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let risk_score = score::composite_score(
                migration_mm[i],
                biometric_mm[i],
                digital_mm[i],
                border_mm[i],
            );
            let verdict = anomaly::detect(migration_z[i], biometric_z[i], cell.migration_velocity);
            if verdict.flagged {
                anomaly_count += 1;
            }

            let calibrated = (cell.population as f64 * POPULATION_CALIBRATION) as i64;
            let mut record = RiskZoneRecord {
                pincode: cell.counts.pincode.clone(),
                district: cell.counts.district.clone(),
                state: cell.counts.state.clone(),
                latitude: cell.counts.latitude,
                longitude: cell.counts.longitude,
                population: Some(cell.population),
                calibrated_population: Some(calibrated),
                lower_ci: Some((calibrated as f64 * CI_LOWER) as i64),
                upper_ci: Some((calibrated as f64 * CI_UPPER) as i64),
                risk_score: Some(risk_score),
                risk_level: RiskLevel::from_score(risk_score),
                migration_velocity: Some(migration_mm[i]),
                biometric_risk: Some(biometric_mm[i]),
                digital_exclusion: Some(digital_mm[i]),
                electoral_integrity_ratio: Some(cell.electoral_integrity_ratio),
                ghost_voter_risk: cell.ghost_voter_risk,
                anomaly_flag: verdict.flagged,
                anomaly_score: verdict.score,
                is_suppressed: false,
                suppression_reason: None,
                computed_at: computed_at.clone(),
            };

            if policy.should_suppress(cell.population) {
                cells_suppressed += 1;
                record.is_suppressed = true;
                record.suppression_reason = Some(format!(
                    "Population below minimum threshold (n={})",
                    cell.population
                ));
                policy.redact(&mut record);
            }
            record
        })
        .collect();

    store.replace_risk_zones(&records)?;

    let summary = RunSummary {
        run_id: run_id.clone(),
        seed,
        minimum_cell_size: policy.minimum_cell_size(),
        cells_seen,
        cells_scored: records.len(),
        cells_suppressed,
        anomaly_count,
        started_at,
        finished_at: Utc::now().to_rfc3339(),
    };
    store.insert_pipeline_run(&summary)?;
    log::info!(
        "Pipeline {run_id} finished: {} scored, {} suppressed, {} anomalous",
        summary.cells_scored,
        summary.cells_suppressed,
        summary.anomaly_count
    );
    Ok(summary)
}
