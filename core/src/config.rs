//! Pipeline configuration.
//!
//! `minimum_cell_size` is the only externally tunable parameter of the
//! scoring core. It is resolved once at process start and never mutated;
//! runtime code receives it as an immutable PrivacyPolicy value.

use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MINIMUM_CELL_SIZE: i64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Smallest cell population whose statistics may be released.
    #[serde(default = "default_minimum_cell_size")]
    pub minimum_cell_size: i64,
}

fn default_minimum_cell_size() -> i64 {
    DEFAULT_MINIMUM_CELL_SIZE
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            minimum_cell_size: DEFAULT_MINIMUM_CELL_SIZE,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON config file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config.validated()?)
    }

    /// Resolve from the MINIMUM_CELL_SIZE environment variable, falling
    /// back to the default when unset. An unparsable value is an error,
    /// never a silent fallback.
    pub fn from_env() -> PipelineResult<Self> {
        let minimum_cell_size = match std::env::var("MINIMUM_CELL_SIZE") {
            Ok(raw) => raw.parse::<i64>().map_err(|_| PipelineError::InvalidConfig {
                name: "MINIMUM_CELL_SIZE",
                value: raw,
            })?,
            Err(_) => DEFAULT_MINIMUM_CELL_SIZE,
        };
        Self { minimum_cell_size }.validated()
    }

    fn validated(self) -> PipelineResult<Self> {
        if self.minimum_cell_size < 0 {
            return Err(PipelineError::InvalidConfig {
                name: "minimum_cell_size",
                value: self.minimum_cell_size.to_string(),
            });
        }
        Ok(self)
    }
}
