//! Single food item track.

use std::collections::HashMap;

use nalgebra::{Matrix4, Vector4};

use crate::text::label_similarity;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::mask::Mask;
use crate::tracker::matching::Detection;
use crate::tracker::track_state::{Lifecycle, TrackState, Trigger};
use crate::volume::VolumeSample;

/// Persistent identity of one physical food item across frames.
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique within one tracker run, never reused
    pub id: u64,
    /// Label of every matched detection, in frame order
    pub label_history: Vec<String>,
    /// Current lifecycle state
    pub state: TrackState,
    /// Frame of the detection that created the track
    pub first_seen_frame: u64,
    /// Frame of the most recent matched detection
    pub last_seen_frame: u64,
    /// Consecutive frames without a match
    pub misses: u32,
    /// Accepted per-frame volume samples
    pub volume_samples: Vec<VolumeSample>,
    /// Mask centroid of every matched detection
    pub centroid_history: Vec<(f32, f32)>,
    last_mask: Mask,
    mean: Vector4<f64>,
    covariance: Matrix4<f64>,
}

impl Track {
    /// Start a new ACTIVE track from an unmatched detection.
    pub fn new(id: u64, detection: &Detection, kalman_filter: &KalmanFilter) -> Self {
        let centroid = detection.mask.centroid().unwrap_or((0.0, 0.0));
        let scale = mask_scale(&detection.mask);
        let (mean, covariance) =
            kalman_filter.initiate([centroid.0 as f64, centroid.1 as f64], scale);

        Self {
            id,
            label_history: vec![detection.label.clone()],
            state: TrackState::Active,
            first_seen_frame: detection.frame_index,
            last_seen_frame: detection.frame_index,
            misses: 0,
            volume_samples: Vec::new(),
            centroid_history: vec![centroid],
            last_mask: detection.mask.clone(),
            mean,
            covariance,
        }
    }

    /// Most frequent label so far; ties go to the most recent one.
    pub fn label(&self) -> String {
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (pos, label) in self.label_history.iter().enumerate() {
            let entry = counts.entry(label.as_str()).or_insert((0, pos));
            entry.0 += 1;
            entry.1 = pos;
        }
        counts
            .into_iter()
            .max_by_key(|(_, (count, last_pos))| (*count, *last_pos))
            .map(|(label, _)| label.to_string())
            .unwrap_or_default()
    }

    pub fn last_mask(&self) -> &Mask {
        &self.last_mask
    }

    /// Last observed centroid.
    pub fn centroid(&self) -> (f32, f32) {
        self.centroid_history.last().copied().unwrap_or((0.0, 0.0))
    }

    /// Displacement from the last observed centroid to the motion model's prediction.
    pub fn predicted_offset(&self) -> (f32, f32) {
        let (cx, cy) = self.centroid();
        (self.mean[0] as f32 - cx, self.mean[1] as f32 - cy)
    }

    /// Weighted mask overlap plus label similarity against a detection, in [0, 1].
    ///
    /// Zero whenever the projected mask does not touch the detection at all.
    pub fn affinity(&self, detection: &Detection, overlap_weight: f32, label_weight: f32) -> f32 {
        let total = overlap_weight + label_weight;
        if total <= 0.0 {
            return 0.0;
        }
        let (dx, dy) = self.predicted_offset();
        let overlap = self.last_mask.iou_shifted(&detection.mask, dx, dy);
        if overlap <= 0.0 {
            return 0.0;
        }
        let label = label_similarity(&self.label(), &detection.label);
        (overlap_weight * overlap + label_weight * label) / total
    }

    pub fn predict(&mut self, kalman_filter: &KalmanFilter) {
        let (mean, covariance) =
            kalman_filter.predict(&self.mean, &self.covariance, mask_scale(&self.last_mask));
        self.mean = mean;
        self.covariance = covariance;
    }

    /// Absorb a matched detection. Returns the previous state.
    pub fn update(
        &mut self,
        detection: &Detection,
        kalman_filter: &KalmanFilter,
        lifecycle: Lifecycle,
    ) -> TrackState {
        let previous = self.state;
        if let Some((cx, cy)) = detection.mask.centroid() {
            let (mean, covariance) = kalman_filter.update(
                &self.mean,
                &self.covariance,
                [cx as f64, cy as f64],
                mask_scale(&detection.mask),
            );
            self.mean = mean;
            self.covariance = covariance;
            self.centroid_history.push((cx, cy));
        }
        self.last_mask = detection.mask.clone();
        self.label_history.push(detection.label.clone());
        self.last_seen_frame = detection.frame_index;
        self.misses = 0;
        self.state = previous.transition(Trigger::Matched, lifecycle);
        previous
    }

    /// Count one unmatched frame. Returns the previous state.
    pub fn mark_missed(&mut self, lifecycle: Lifecycle) -> TrackState {
        let previous = self.state;
        self.misses += 1;
        self.state = previous.transition(
            Trigger::Missed {
                misses: self.misses,
            },
            lifecycle,
        );
        if previous == TrackState::Active && self.state != TrackState::Active {
            // Lost items are expected back where they vanished.
            self.mean[2] = 0.0;
            self.mean[3] = 0.0;
        }
        previous
    }

    pub fn force_close(&mut self, lifecycle: Lifecycle) -> TrackState {
        let previous = self.state;
        self.state = previous.transition(Trigger::ForceClose, lifecycle);
        previous
    }

    pub fn push_sample(&mut self, sample: VolumeSample) {
        self.volume_samples.push(sample);
    }

    pub fn has_samples(&self) -> bool {
        !self.volume_samples.is_empty()
    }

    /// Sample volumes in cm³, in frame order.
    pub fn sample_volumes(&self) -> Vec<f64> {
        self.volume_samples.iter().map(|s| s.volume_cm3).collect()
    }
}

fn mask_scale(mask: &Mask) -> f64 {
    (mask.area() as f64).sqrt().max(1.0)
}
