//! Per-meal aggregation of finalized tracks.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::nutrition::{MatchKind, NutrientBreakdown, NutritionResolver, Retriever};
use crate::tracker::{Track, TrackState};
use crate::volume::VolumeEstimator;

/// One food item in the final report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportItem {
    pub track_id: u64,
    pub label: String,
    pub matched_label: Option<String>,
    pub first_frame: u64,
    pub last_frame: u64,
    pub sample_count: usize,
    pub volume_cm3: f64,
    pub estimated_mass_g: f64,
    pub nutrients: BTreeMap<String, f64>,
    pub match_kind: MatchKind,
    pub low_confidence: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// No frame produced usable depth coverage.
    NoVolumeSamples,
    /// Track was still open when the report was built.
    NotClosed,
}

/// A track left out of the report, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedTrack {
    pub track_id: u64,
    pub label: String,
    pub reason: DropReason,
}

/// Nutrition estimate for a whole meal. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MealReport {
    pub items: Vec<ReportItem>,
    pub total_mass_g: f64,
    pub totals: BTreeMap<String, f64>,
    pub dropped: Vec<DroppedTrack>,
}

impl MealReport {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_low_confidence_items(&self) -> bool {
        self.items.iter().any(|i| i.low_confidence)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Combines closed tracks into a [`MealReport`].
pub struct Aggregator<'r, 'a, R> {
    estimator: &'r VolumeEstimator,
    resolver: &'r NutritionResolver<'a, R>,
}

impl<'r, 'a, R: Retriever> Aggregator<'r, 'a, R> {
    pub fn new(estimator: &'r VolumeEstimator, resolver: &'r NutritionResolver<'a, R>) -> Self {
        Self {
            estimator,
            resolver,
        }
    }

    /// Resolve every CLOSED track with at least one sample; the rest are dropped with a warning.
    pub fn aggregate(&self, tracks: &[Track]) -> MealReport {
        let mut ordered: Vec<&Track> = tracks.iter().collect();
        ordered.sort_by_key(|t| t.id);

        let mut dropped = Vec::new();
        let mut eligible = Vec::new();
        for track in ordered {
            let reason = if track.state != TrackState::Closed {
                Some(DropReason::NotClosed)
            } else if !track.has_samples() {
                Some(DropReason::NoVolumeSamples)
            } else {
                None
            };
            match reason {
                Some(reason) => {
                    let label = track.label();
                    warn!(track_id = track.id, %label, ?reason, "track dropped from report");
                    dropped.push(DroppedTrack {
                        track_id: track.id,
                        label,
                        reason,
                    });
                }
                None => eligible.push(track),
            }
        }

        let resolved: Vec<Result<ReportItem, DroppedTrack>> = eligible
            .par_iter()
            .map(|track| self.resolve_track(track))
            .collect();

        let mut items = Vec::with_capacity(resolved.len());
        for entry in resolved {
            match entry {
                Ok(item) => items.push(item),
                Err(drop) => {
                    warn!(track_id = drop.track_id, label = %drop.label, "track has no finite volume samples");
                    dropped.push(drop);
                }
            }
        }
        dropped.sort_by_key(|d| d.track_id);

        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        let mut total_mass_g = 0.0;
        for item in &items {
            total_mass_g += item.estimated_mass_g;
            for (name, amount) in &item.nutrients {
                *totals.entry(name.clone()).or_insert(0.0) += amount;
            }
        }

        info!(
            items = items.len(),
            dropped = dropped.len(),
            total_mass_g,
            "meal report built"
        );
        MealReport {
            items,
            total_mass_g,
            totals,
            dropped,
        }
    }

    fn resolve_track(&self, track: &Track) -> Result<ReportItem, DroppedTrack> {
        let label = track.label();
        let Some(volume_cm3) = self.estimator.stabilized_volume(track) else {
            return Err(DroppedTrack {
                track_id: track.id,
                label,
                reason: DropReason::NoVolumeSamples,
            });
        };
        let NutrientBreakdown {
            matched_label,
            mass_g,
            nutrients,
            match_kind,
            ..
        } = self.resolver.resolve(&label, volume_cm3);
        Ok(ReportItem {
            track_id: track.id,
            label,
            matched_label,
            first_frame: track.first_seen_frame,
            last_frame: track.last_seen_frame,
            sample_count: track.volume_samples.len(),
            volume_cm3,
            estimated_mass_g: mass_g,
            nutrients,
            low_confidence: matches!(match_kind, MatchKind::Fallback),
            match_kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::{NutritionConfig, ReferenceTables};
    use crate::tracker::{Detection, Lifecycle, Mask, Rect, TrackManager, TrackerConfig};
    use crate::volume::{VolumeConfig, VolumeSample};

    fn tables() -> ReferenceTables {
        ReferenceTables::from_json_str(
            r#"[{"label": "apple", "density": 0.8, "nutrients_per_100g": {"energy_kcal": 52}}]"#,
        )
        .unwrap()
    }

    fn closed_tracks(samples: &[&[f64]]) -> Vec<Track> {
        let mut manager = TrackManager::new(TrackerConfig::default());
        let detections: Vec<Detection> = (0..samples.len())
            .map(|i| {
                let mask = Mask::from_rect(100, 100, Rect::new(i as f32 * 20.0, 0.0, 10.0, 10.0));
                Detection::new(mask, "apple", 0.9, 0)
            })
            .collect();
        manager.update(0, &detections);
        manager.finish();
        let mut tracks = manager.into_tracks();
        for (track, volumes) in tracks.iter_mut().zip(samples) {
            for &v in *volumes {
                track.push_sample(VolumeSample {
                    track_id: track.id,
                    frame_index: 0,
                    volume_cm3: v,
                    valid_fraction: 1.0,
                });
            }
        }
        tracks
    }

    #[test]
    fn test_tracks_without_samples_are_dropped() {
        let tables = tables();
        let resolver = NutritionResolver::new(&tables, NutritionConfig::default());
        let estimator = VolumeEstimator::new(&VolumeConfig::default());
        let aggregator = Aggregator::new(&estimator, &resolver);

        let tracks = closed_tracks(&[&[100.0, 110.0, 90.0], &[]]);
        let report = aggregator.aggregate(&tracks);
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].track_id, 1);
        assert!((report.items[0].volume_cm3 - 100.0).abs() < 1e-9);
        assert!((report.items[0].estimated_mass_g - 80.0).abs() < 1e-9);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].reason, DropReason::NoVolumeSamples);
        assert!((report.totals["energy_kcal"] - 41.6).abs() < 1e-9);
    }

    #[test]
    fn test_open_tracks_are_not_reported() {
        let tables = tables();
        let resolver = NutritionResolver::new(&tables, NutritionConfig::default());
        let estimator = VolumeEstimator::new(&VolumeConfig::default());
        let aggregator = Aggregator::new(&estimator, &resolver);

        let mut tracks = closed_tracks(&[&[100.0]]);
        tracks[0].state = TrackState::Active;
        let report = aggregator.aggregate(&tracks);
        assert!(report.is_empty());
        assert_eq!(report.dropped[0].reason, DropReason::NotClosed);

        let lifecycle = Lifecycle {
            lost_after: 1,
            redetection_window: 1,
        };
        tracks[0].force_close(lifecycle);
        assert_eq!(aggregator.aggregate(&tracks).items.len(), 1);
    }

    #[test]
    fn test_report_serializes() {
        let tables = tables();
        let resolver = NutritionResolver::new(&tables, NutritionConfig::default());
        let estimator = VolumeEstimator::new(&VolumeConfig::default());
        let report = Aggregator::new(&estimator, &resolver).aggregate(&closed_tracks(&[&[50.0]]));
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["items"][0]["label"], "apple");
        assert_eq!(value["items"][0]["match_kind"]["kind"], "exact");
        assert_eq!(value["items"][0]["low_confidence"], false);
    }
}
