//! Statistical anomaly detection, independent of the composite score.

/// Absolute modified z-score above which a feature is an outlier.
pub const MODIFIED_Z_CUTOFF: f64 = 3.5;

/// Absolute migration-velocity ceiling. Catches the degenerate batch whose
/// MAD collapses to zero and silences every z-score.
pub const MIGRATION_VELOCITY_CEILING: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyVerdict {
    pub flagged: bool,
    /// Larger of the two absolute z-scores when flagged, else 0.
    pub score: f64,
}

/// Judge one cell from its two robust z-scores and its raw velocity.
pub fn detect(migration_z: f64, biometric_z: f64, raw_migration_velocity: f64) -> AnomalyVerdict {
    let flagged = migration_z.abs() > MODIFIED_Z_CUTOFF
        || biometric_z.abs() > MODIFIED_Z_CUTOFF
        || raw_migration_velocity > MIGRATION_VELOCITY_CEILING;
    let score = if flagged {
        migration_z.abs().max(biometric_z.abs())
    } else {
        0.0
    };
    AnomalyVerdict { flagged, score }
}
