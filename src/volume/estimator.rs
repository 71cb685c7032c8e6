//! Mask + depth map to per-frame volume samples, and per-track stabilization.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tracker::{Mask, Track};
use crate::volume::camera::CameraModel;
use crate::volume::depth::DepthMap;
use crate::volume::model::{SurfacePoint, VolumeModel, VolumeModelKind};
use crate::volume::statistic::AggregationStatistic;

const CM3_PER_M3: f64 = 1e6;

/// Configuration for the [`VolumeEstimator`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub camera: CameraModel,
    /// Samples whose mask has a smaller fraction of valid depth pixels are rejected
    pub min_valid_fraction: f32,
    pub model: VolumeModelKind,
    /// Depth percentile (0..1) of the masked pixels taken as the supporting plane
    pub support_percentile: f64,
    pub statistic: AggregationStatistic,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            camera: CameraModel::default(),
            min_valid_fraction: 0.5,
            model: VolumeModelKind::default(),
            support_percentile: 0.9,
            statistic: AggregationStatistic::default(),
        }
    }
}

/// One volume estimate for a (track, frame) pair. Always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeSample {
    pub track_id: u64,
    pub frame_index: u64,
    pub volume_cm3: f64,
    /// Fraction of mask pixels that had a valid depth reading
    pub valid_fraction: f32,
}

pub struct VolumeEstimator {
    camera: CameraModel,
    min_valid_fraction: f32,
    model: Box<dyn VolumeModel>,
    statistic: AggregationStatistic,
}

impl VolumeEstimator {
    pub fn new(config: &VolumeConfig) -> Self {
        Self::with_model(config, config.model.build(config.support_percentile))
    }

    /// Use a custom geometric model instead of the configured one.
    pub fn with_model(config: &VolumeConfig, model: Box<dyn VolumeModel>) -> Self {
        Self {
            camera: config.camera,
            min_valid_fraction: config.min_valid_fraction,
            model,
            statistic: config.statistic,
        }
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    /// Sample `track` from the mask it was matched with on its latest frame.
    pub fn estimate(&self, track: &Track, mask: &Mask, depth: &DepthMap) -> Option<VolumeSample> {
        self.sample(track.id, track.last_seen_frame, mask, depth)
    }

    /// Volume of the masked region, or `None` if the depth evidence is insufficient.
    pub fn sample(
        &self,
        track_id: u64,
        frame_index: u64,
        mask: &Mask,
        depth: &DepthMap,
    ) -> Option<VolumeSample> {
        if mask.shape() != depth.shape() {
            debug!(
                track_id,
                frame_index,
                mask_shape = ?mask.shape(),
                depth_shape = ?depth.shape(),
                "mask and depth map differ in size, sample rejected"
            );
            return None;
        }

        let mut total = 0usize;
        let mut points = Vec::new();
        for (row, col) in mask.pixels() {
            total += 1;
            if let Some(d) = depth.get(row, col) {
                let d = d as f64;
                points.push(SurfacePoint {
                    area_m2: self.camera.pixel_footprint(d),
                    depth_m: d,
                });
            }
        }
        if total == 0 {
            return None;
        }

        let valid_fraction = points.len() as f32 / total as f32;
        if valid_fraction < self.min_valid_fraction {
            debug!(
                track_id,
                frame_index, valid_fraction, "depth coverage too low, sample rejected"
            );
            return None;
        }

        let volume_m3 = self.model.integrate(&points);
        if !volume_m3.is_finite() {
            return None;
        }
        Some(VolumeSample {
            track_id,
            frame_index,
            volume_cm3: (volume_m3 * CM3_PER_M3).max(0.0),
            valid_fraction,
        })
    }

    /// Robust aggregate of the track's samples in cm³.
    pub fn stabilized_volume(&self, track: &Track) -> Option<f64> {
        self.statistic.stabilize(&track.sample_volumes())
    }

    pub fn statistic(&self) -> AggregationStatistic {
        self.statistic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Rect;
    use crate::volume::depth::INVALID_DEPTH;

    fn config(model: VolumeModelKind) -> VolumeConfig {
        VolumeConfig {
            camera: CameraModel::new(0.005, 0.005),
            model,
            ..VolumeConfig::default()
        }
    }

    #[test]
    fn test_unit_square_at_one_meter() {
        // 200x200 pixels at 0.005 rad/px and 1 m depth cover 1 m x 1 m.
        let estimator = VolumeEstimator::new(&config(VolumeModelKind::Column));
        let mask = Mask::from_rect(200, 200, Rect::new(0.0, 0.0, 200.0, 200.0));
        let depth = DepthMap::filled(200, 200, 1.0);
        let sample = estimator.sample(1, 0, &mask, &depth).unwrap();
        let expected_cm3 = 1.0 * 1.0 * CM3_PER_M3;
        assert!(
            ((sample.volume_cm3 - expected_cm3) / expected_cm3).abs() < 1e-3,
            "volume = {}",
            sample.volume_cm3
        );
        assert_eq!(sample.valid_fraction, 1.0);
    }

    #[test]
    fn test_low_coverage_is_rejected() {
        let estimator = VolumeEstimator::new(&config(VolumeModelKind::Column));
        let mask = Mask::from_rect(10, 10, Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut depth = DepthMap::filled(10, 10, 1.0);
        for r in 0..6 {
            for c in 0..10 {
                depth.data_mut()[[r, c]] = INVALID_DEPTH;
            }
        }
        assert!(estimator.sample(1, 0, &mask, &depth).is_none());

        for c in 0..10 {
            depth.data_mut()[[5, c]] = 1.0;
        }
        let sample = estimator.sample(1, 0, &mask, &depth).unwrap();
        assert!((sample.valid_fraction - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_empty_or_mismatched_mask() {
        let estimator = VolumeEstimator::new(&config(VolumeModelKind::Relief));
        let depth = DepthMap::filled(10, 10, 1.0);
        assert!(estimator.sample(1, 0, &Mask::empty(10, 10), &depth).is_none());
        let wide = Mask::from_rect(10, 20, Rect::new(0.0, 0.0, 5.0, 5.0));
        assert!(estimator.sample(1, 0, &wide, &depth).is_none());
    }

    #[test]
    fn test_relief_sample_of_flat_plane_is_zero() {
        let estimator = VolumeEstimator::new(&config(VolumeModelKind::Relief));
        let mask = Mask::from_rect(10, 10, Rect::new(0.0, 0.0, 10.0, 10.0));
        let sample = estimator
            .sample(1, 0, &mask, &DepthMap::filled(10, 10, 0.5))
            .unwrap();
        assert_eq!(sample.volume_cm3, 0.0);
    }
}
