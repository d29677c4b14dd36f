//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The pipeline and the read-side gate call store methods — they never
//! execute SQL directly.

use crate::{
    aggregate::RawCellCounts,
    error::PipelineResult,
    pipeline::{RiskZoneRecord, RunSummary},
    score::RiskLevel,
};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

const ZONE_COLUMNS: &str = "pincode, district, state, latitude, longitude, population, \
     calibrated_population, lower_ci, upper_ci, risk_score, risk_level, migration_velocity, \
     biometric_risk, digital_exclusion, electoral_integrity_ratio, ghost_voter_risk, \
     anomaly_flag, anomaly_score, is_suppressed, suppression_reason, computed_at";

pub struct ZoneStore {
    conn: Connection,
}

impl ZoneStore {
    /// Open (or create) the zone database at `path`.
    pub fn open(path: &str) -> PipelineResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance (ignored by :memory:).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PipelineResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> PipelineResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Raw counts and metadata ────────────────────────────────

    pub fn insert_pincode_metadata(&self, row: &PincodeMetadataRow) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO pincode_metadata (
                pincode, post_office_name, district, state, division, region,
                circle, latitude, longitude, delivery_status, office_type
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                row.pincode,
                row.post_office_name,
                row.district,
                row.state,
                row.division,
                row.region,
                row.circle,
                row.latitude,
                row.longitude,
                row.delivery_status,
                row.office_type,
            ],
        )?;
        Ok(())
    }

    pub fn insert_biometric(&self, row: &CountRow) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO biometric_data (
                record_date, state, district, pincode,
                bio_age_0_5, bio_age_5_17, bio_age_17_plus, total_biometric
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.record_date,
                row.state,
                row.district,
                row.pincode,
                row.age_0_5,
                row.age_5_17,
                row.age_17_plus,
                row.total,
            ],
        )?;
        Ok(())
    }

    pub fn insert_demographic(&self, row: &CountRow) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO demographic_data (
                record_date, state, district, pincode,
                demo_age_0_5, demo_age_5_17, demo_age_17_plus, total_demographic
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.record_date,
                row.state,
                row.district,
                row.pincode,
                row.age_0_5,
                row.age_5_17,
                row.age_17_plus,
                row.total,
            ],
        )?;
        Ok(())
    }

    pub fn insert_enrolment(&self, row: &CountRow) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO enrolment_data (
                record_date, state, district, pincode,
                age_0_5, age_5_17, age_18_greater, total_enrolment
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.record_date,
                row.state,
                row.district,
                row.pincode,
                row.age_0_5,
                row.age_5_17,
                row.age_17_plus,
                row.total,
            ],
        )?;
        Ok(())
    }

    /// Sum each source's total per metadata cell. Cells with counts but no
    /// metadata never appear; a source with no rows contributes 0. Ordered
    /// by pincode so downstream jitter draws are stable across runs.
    pub fn cell_counts(&self) -> PipelineResult<Vec<RawCellCounts>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.pincode, m.district, m.state, m.latitude, m.longitude,
                    COALESCE(b.total, 0), COALESCE(d.total, 0), COALESCE(e.total, 0)
             FROM pincode_metadata m
             LEFT JOIN (SELECT pincode, SUM(total_biometric) AS total
                        FROM biometric_data GROUP BY pincode) b ON b.pincode = m.pincode
             LEFT JOIN (SELECT pincode, SUM(total_demographic) AS total
                        FROM demographic_data GROUP BY pincode) d ON d.pincode = m.pincode
             LEFT JOIN (SELECT pincode, SUM(total_enrolment) AS total
                        FROM enrolment_data GROUP BY pincode) e ON e.pincode = m.pincode
             ORDER BY m.pincode ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RawCellCounts {
                pincode: row.get(0)?,
                district: row.get(1)?,
                state: row.get(2)?,
                latitude: row.get(3)?,
                longitude: row.get(4)?,
                biometric_total: row.get(5)?,
                demographic_total: row.get(6)?,
                enrolment_total: row.get(7)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Risk zones ─────────────────────────────────────────────

    /// Replace the full risk_zones set in one transaction. IMMEDIATE, so
    /// concurrent pipeline runs serialize; readers see either the old set
    /// or the new one, never a half-replaced table. Any failure rolls back
    /// to the prior complete set.
    pub fn replace_risk_zones(&mut self, records: &[RiskZoneRecord]) -> PipelineResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM risk_zones", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO risk_zones (
                    pincode, district, state, latitude, longitude, population,
                    calibrated_population, lower_ci, upper_ci, risk_score, risk_level,
                    migration_velocity, biometric_risk, digital_exclusion,
                    electoral_integrity_ratio, ghost_voter_risk, anomaly_flag,
                    anomaly_score, is_suppressed, suppression_reason, computed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                          ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
            )?;
            for r in records {
                stmt.execute(params![
                    r.pincode,
                    r.district,
                    r.state,
                    r.latitude,
                    r.longitude,
                    r.population,
                    r.calibrated_population,
                    r.lower_ci,
                    r.upper_ci,
                    r.risk_score,
                    r.risk_level.as_str(),
                    r.migration_velocity,
                    r.biometric_risk,
                    r.digital_exclusion,
                    r.electoral_integrity_ratio,
                    if r.ghost_voter_risk { 1 } else { 0 },
                    if r.anomaly_flag { 1 } else { 0 },
                    r.anomaly_score,
                    if r.is_suppressed { 1 } else { 0 },
                    r.suppression_reason,
                    r.computed_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Every persisted zone in pincode order, unfiltered. Pipeline-internal
    /// and test use; consumer reads go through the read module.
    pub fn all_risk_zones(&self) -> PipelineResult<Vec<RiskZoneRecord>> {
        let sql = format!("SELECT {ZONE_COLUMNS} FROM risk_zones ORDER BY pincode ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| map_zone_row(row))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Stored-flag-unsuppressed zones by descending risk score, optionally
    /// filtered by level and state.
    pub fn risk_zones_filtered(
        &self,
        level: Option<RiskLevel>,
        state: Option<&str>,
        limit: usize,
    ) -> PipelineResult<Vec<RiskZoneRecord>> {
        let mut sql = format!("SELECT {ZONE_COLUMNS} FROM risk_zones WHERE is_suppressed = 0");
        let mut bind: Vec<rusqlite::types::Value> = Vec::new();
        if let Some(level) = level {
            sql.push_str(" AND risk_level = ?");
            bind.push(level.as_str().to_string().into());
        }
        if let Some(state) = state {
            sql.push_str(" AND state = ?");
            bind.push(state.to_string().into());
        }
        sql.push_str(" ORDER BY risk_score DESC LIMIT ?");
        bind.push((limit as i64).into());

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(bind), |row| map_zone_row(row))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn risk_zone_by_pincode(&self, pincode: &str) -> PipelineResult<Option<RiskZoneRecord>> {
        let sql = format!("SELECT {ZONE_COLUMNS} FROM risk_zones WHERE pincode = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let zone = stmt
            .query_row(params![pincode], |row| map_zone_row(row))
            .optional()?;
        Ok(zone)
    }

    pub fn anomalous_zones(&self, limit: usize) -> PipelineResult<Vec<RiskZoneRecord>> {
        let sql = format!(
            "SELECT {ZONE_COLUMNS} FROM risk_zones
             WHERE anomaly_flag = 1 AND is_suppressed = 0
             ORDER BY anomaly_score DESC LIMIT ?1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], |row| map_zone_row(row))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// (state, population) pairs over released zones, for group-wise
    /// aggregation behind the privacy gate.
    pub fn state_populations(&self) -> PipelineResult<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT state, COALESCE(population, 0) FROM risk_zones WHERE is_suppressed = 0",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn risk_zone_count(&self) -> PipelineResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM risk_zones", [], |row| row.get(0))?;
        Ok(count)
    }

    // ── Run log ────────────────────────────────────────────────

    pub fn insert_pipeline_run(&self, summary: &RunSummary) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO pipeline_run (
                run_id, seed, minimum_cell_size, cells_seen, cells_scored,
                cells_suppressed, anomaly_count, started_at, finished_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                summary.run_id,
                summary.seed as i64,
                summary.minimum_cell_size,
                summary.cells_seen as i64,
                summary.cells_scored as i64,
                summary.cells_suppressed as i64,
                summary.anomaly_count as i64,
                summary.started_at,
                summary.finished_at,
            ],
        )?;
        Ok(())
    }

    pub fn pipeline_run_count(&self) -> PipelineResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM pipeline_run", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// One metadata row. The metadata table is the authoritative cell set.
#[derive(Debug, Clone, Default)]
pub struct PincodeMetadataRow {
    pub pincode: String,
    pub post_office_name: Option<String>,
    pub district: String,
    pub state: String,
    pub division: Option<String>,
    pub region: Option<String>,
    pub circle: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub delivery_status: Option<String>,
    pub office_type: Option<String>,
}

/// One dated count row for any of the three sources.
#[derive(Debug, Clone)]
pub struct CountRow {
    pub record_date: String,
    pub state: String,
    pub district: String,
    pub pincode: String,
    pub age_0_5: i64,
    pub age_5_17: i64,
    pub age_17_plus: i64,
    pub total: i64,
}

fn map_zone_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RiskZoneRecord> {
    let level_label: String = row.get(10)?;
    let risk_level = RiskLevel::from_label(&level_label).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            10,
            rusqlite::types::Type::Text,
            format!("unknown risk level '{level_label}'").into(),
        )
    })?;
    Ok(RiskZoneRecord {
        pincode: row.get(0)?,
        district: row.get(1)?,
        state: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        population: row.get(5)?,
        calibrated_population: row.get(6)?,
        lower_ci: row.get(7)?,
        upper_ci: row.get(8)?,
        risk_score: row.get(9)?,
        risk_level,
        migration_velocity: row.get(11)?,
        biometric_risk: row.get(12)?,
        digital_exclusion: row.get(13)?,
        electoral_integrity_ratio: row.get(14)?,
        ghost_voter_risk: row.get::<_, i64>(15)? != 0,
        anomaly_flag: row.get::<_, i64>(16)? != 0,
        anomaly_score: row.get(17)?,
        is_suppressed: row.get::<_, i64>(18)? != 0,
        suppression_reason: row.get(19)?,
        computed_at: row.get(20)?,
    })
}
