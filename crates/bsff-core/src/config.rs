//! # Engine Configuration
//!
//! Tunable limits and regulatory cut-over dates, loaded from YAML.
//! Every field has a default, so an empty document is a valid config.
//!
//! ```yaml
//! max_transporters: 5
//! max_plates: 2
//! correction_window_days: 60
//! max_road_weight_tonnes: 40.0
//! strictly_positive_weights_from: 2024-07-03
//! container_volume_required_from: 2024-09-24
//! ```

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::BsffError;
use crate::temporal::Timestamp;

/// Number of transporter slots in the document stage hierarchy.
pub const TRANSPORTER_SLOTS: usize = 5;

/// Limits and cut-over dates applied by the validation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum number of transporters on one document (at most 5).
    pub max_transporters: usize,
    /// Maximum number of plates per transporter.
    pub max_plates: usize,
    /// Days after the operation signature during which a container's
    /// acceptance and operation data can still be corrected.
    pub correction_window_days: i64,
    /// Maximum total weight when any transporter travels by road.
    pub max_road_weight_tonnes: f64,
    /// Documents created on or after this date must declare strictly
    /// positive weights.
    pub strictly_positive_weights_from: NaiveDate,
    /// Documents created on or after this date must declare container volumes.
    pub container_volume_required_from: NaiveDate,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_transporters: TRANSPORTER_SLOTS,
            max_plates: 2,
            correction_window_days: 60,
            max_road_weight_tonnes: 40.0,
            strictly_positive_weights_from: NaiveDate::from_ymd_opt(2024, 7, 3)
                .unwrap_or(NaiveDate::MIN),
            container_volume_required_from: NaiveDate::from_ymd_opt(2024, 9, 24)
                .unwrap_or(NaiveDate::MIN),
        }
    }
}

impl EngineConfig {
    /// Parse and check a YAML configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, BsffError> {
        let config: EngineConfig = if yaml.trim().is_empty() {
            EngineConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.check()?;
        Ok(config)
    }

    /// Read, parse and check a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, BsffError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Reject values the stage hierarchy cannot represent.
    pub fn check(&self) -> Result<(), BsffError> {
        if self.max_transporters == 0 || self.max_transporters > TRANSPORTER_SLOTS {
            return Err(BsffError::Config(format!(
                "max_transporters must be between 1 and {TRANSPORTER_SLOTS}, got {}",
                self.max_transporters
            )));
        }
        if self.correction_window_days < 0 {
            return Err(BsffError::Config(format!(
                "correction_window_days must not be negative, got {}",
                self.correction_window_days
            )));
        }
        if self.max_road_weight_tonnes.is_nan() || self.max_road_weight_tonnes <= 0.0 {
            return Err(BsffError::Config(format!(
                "max_road_weight_tonnes must be positive, got {}",
                self.max_road_weight_tonnes
            )));
        }
        Ok(())
    }

    /// Whether a document created at `created_at` must carry strictly
    /// positive weights.
    pub fn requires_positive_weights(&self, created_at: &Timestamp) -> bool {
        created_at.as_datetime().date_naive() >= self.strictly_positive_weights_from
    }

    /// Whether a document created at `created_at` must declare container volumes.
    pub fn requires_container_volume(&self, created_at: &Timestamp) -> bool {
        created_at.as_datetime().date_naive() >= self.container_volume_required_from
    }
}
