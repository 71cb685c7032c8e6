//! Pipeline configuration, loadable from TOML.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::ConfigError;
use crate::nutrition::NutritionConfig;
use crate::tracker::TrackerConfig;
use crate::volume::{AggregationStatistic, VolumeConfig};

/// Values consumed by the core. Every field has a default, so an empty file is valid.
///
/// ```toml
/// frame_stride = 10
/// max_frames = 30
///
/// [tracker]
/// redetection_window = 15
///
/// [volume]
/// model = "frustum"
/// statistic = { kind = "trimmed_mean", trim = 0.1 }
///
/// [nutrition]
/// confidence_floor = 0.6
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tracker: TrackerConfig,
    pub volume: VolumeConfig,
    pub nutrition: NutritionConfig,
    /// Only every Nth frame from the source is processed
    pub frame_stride: u32,
    /// Stop after this many frames were processed or skipped
    pub max_frames: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            volume: VolumeConfig::default(),
            nutrition: NutritionConfig::default(),
            frame_stride: 1,
            max_frames: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject settings the core cannot run with; warn on ones that are merely odd.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tracker;
        if !(0.0..=1.0).contains(&t.affinity_threshold) {
            return invalid(format!(
                "tracker.affinity_threshold must be in [0, 1], got {}",
                t.affinity_threshold
            ));
        }
        if t.overlap_weight < 0.0 || t.label_weight < 0.0 || t.overlap_weight + t.label_weight <= 0.0
        {
            return invalid("tracker weights must be non-negative with a positive sum".into());
        }
        if t.lost_after == 0 {
            return invalid("tracker.lost_after must be at least 1".into());
        }
        if t.redetection_window <= t.lost_after {
            return invalid(format!(
                "tracker.redetection_window ({}) must exceed tracker.lost_after ({})",
                t.redetection_window, t.lost_after
            ));
        }
        if t.label_weight >= t.affinity_threshold * (t.overlap_weight + t.label_weight) {
            warn!("label similarity alone can clear the affinity threshold for barely touching masks");
        }

        let v = &self.volume;
        if !v.camera.is_valid() {
            return invalid("volume.camera angular resolution must be positive and finite".into());
        }
        if !(0.0..=1.0).contains(&v.min_valid_fraction) {
            return invalid(format!(
                "volume.min_valid_fraction must be in [0, 1], got {}",
                v.min_valid_fraction
            ));
        }
        if !(0.0..=1.0).contains(&v.support_percentile) {
            return invalid(format!(
                "volume.support_percentile must be in [0, 1], got {}",
                v.support_percentile
            ));
        }
        match v.statistic {
            AggregationStatistic::TrimmedMean { trim } if !(0.0..0.5).contains(&trim) => {
                return invalid(format!("volume.statistic.trim must be in [0, 0.5), got {trim}"));
            }
            AggregationStatistic::MadFilteredMean { k } if !(k.is_finite() && k > 0.0) => {
                return invalid(format!("volume.statistic.k must be positive, got {k}"));
            }
            _ => {}
        }

        let n = &self.nutrition;
        if !(0.0..=1.0).contains(&n.confidence_floor) {
            return invalid(format!(
                "nutrition.confidence_floor must be in [0, 1], got {}",
                n.confidence_floor
            ));
        }
        if !(n.default_density.is_finite() && n.default_density > 0.0) {
            return invalid(format!(
                "nutrition.default_density must be positive, got {}",
                n.default_density
            ));
        }
        if n.candidate_limit == 0 {
            return invalid("nutrition.candidate_limit must be at least 1".into());
        }

        if self.frame_stride == 0 {
            return invalid("frame_stride must be at least 1".into());
        }
        if self.max_frames == Some(0) {
            return invalid("max_frames must be at least 1 when set".into());
        }
        Ok(())
    }
}

fn invalid(message: String) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(message))
}
