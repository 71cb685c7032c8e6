//! Frame-by-frame track maintenance with redetection.

use ndarray::Array2;
use serde::Deserialize;
use tracing::{debug, info};

use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, AssignmentResult, AssignmentStrategy, Detection};
use crate::tracker::track::Track;
use crate::tracker::track_state::{Lifecycle, TrackState};

/// Configuration for the [`TrackManager`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Minimum affinity for a detection/track pair to match
    pub affinity_threshold: f32,
    /// Weight of projected mask IoU in the affinity
    pub overlap_weight: f32,
    /// Weight of label similarity in the affinity
    pub label_weight: f32,
    /// Consecutive misses before ACTIVE -> LOST (k)
    pub lost_after: u32,
    /// Consecutive misses tolerated before LOST -> CLOSED (K)
    pub redetection_window: u32,
    pub assignment: AssignmentStrategy,
    /// Detections below this confidence are ignored
    pub min_confidence: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            affinity_threshold: 0.35,
            overlap_weight: 0.7,
            label_weight: 0.3,
            lost_after: 2,
            redetection_window: 30,
            assignment: AssignmentStrategy::Optimal,
            min_confidence: 0.25,
        }
    }
}

impl TrackerConfig {
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle {
            lost_after: self.lost_after,
            redetection_window: self.redetection_window,
        }
    }
}

/// What happened to a track during one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    /// New track spawned from detection `detection`.
    Created { track_id: u64, detection: usize },
    /// ACTIVE track matched detection `detection`.
    Updated { track_id: u64, detection: usize },
    /// LOST track matched again, keeping its id and history.
    Redetected { track_id: u64, detection: usize },
    /// ACTIVE track crossed the miss limit.
    Lost { track_id: u64 },
    /// Track finalized.
    Closed { track_id: u64 },
}

impl TrackEvent {
    pub fn track_id(&self) -> u64 {
        match *self {
            TrackEvent::Created { track_id, .. }
            | TrackEvent::Updated { track_id, .. }
            | TrackEvent::Redetected { track_id, .. }
            | TrackEvent::Lost { track_id }
            | TrackEvent::Closed { track_id } => track_id,
        }
    }

    /// Detection index for events that consumed a detection.
    pub fn detection(&self) -> Option<usize> {
        match *self {
            TrackEvent::Created { detection, .. }
            | TrackEvent::Updated { detection, .. }
            | TrackEvent::Redetected { detection, .. } => Some(detection),
            _ => None,
        }
    }
}

/// Owns every track of one video run. Single writer: all mutation goes through `&mut self`.
pub struct TrackManager {
    tracks: Vec<Track>,
    next_id: u64,
    frame_index: Option<u64>,
    config: TrackerConfig,
    kalman_filter: KalmanFilter,
}

impl TrackManager {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            frame_index: None,
            config,
            kalman_filter: KalmanFilter::default(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// All tracks ever created, in id order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, track_id: u64) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    pub fn track_mut(&mut self, track_id: u64) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == track_id)
    }

    /// Tracks that can still receive detections.
    pub fn open_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| t.state.is_matchable())
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.frame_index
    }

    /// Match `detections` against ACTIVE and LOST tracks and advance every track one frame.
    pub fn update(&mut self, frame_index: u64, detections: &[Detection]) -> Vec<TrackEvent> {
        self.frame_index = Some(frame_index);
        let lifecycle = self.config.lifecycle();
        let mut events = Vec::new();

        // Step 1: Drop weak detections
        let candidates: Vec<usize> = detections
            .iter()
            .enumerate()
            .filter(|(_, d)| d.confidence >= self.config.min_confidence && !d.mask.is_empty())
            .map(|(i, _)| i)
            .collect();

        // Step 2: Project open tracks forward
        let pool: Vec<usize> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.state.is_matchable())
            .map(|(i, _)| i)
            .collect();
        for &i in &pool {
            self.tracks[i].predict(&self.kalman_filter);
        }

        // Step 3: Associate
        let mut affinity = Array2::<f32>::zeros((pool.len(), candidates.len()));
        for (row, &ti) in pool.iter().enumerate() {
            for (col, &di) in candidates.iter().enumerate() {
                affinity[[row, col]] = self.tracks[ti].affinity(
                    &detections[di],
                    self.config.overlap_weight,
                    self.config.label_weight,
                );
            }
        }
        let cost = matching::affinity_distance(&affinity);
        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = matching::assign(
            &cost,
            1.0 - self.config.affinity_threshold,
            self.config.assignment,
        );

        for (row, col) in matches {
            let det_index = candidates[col];
            let track = &mut self.tracks[pool[row]];
            let previous = track.update(&detections[det_index], &self.kalman_filter, lifecycle);
            debug!(
                track_id = track.id,
                frame_index,
                affinity = affinity[[row, col]],
                "matched detection"
            );
            events.push(if previous == TrackState::Lost {
                info!(track_id = track.id, frame_index, "track redetected");
                TrackEvent::Redetected {
                    track_id: track.id,
                    detection: det_index,
                }
            } else {
                TrackEvent::Updated {
                    track_id: track.id,
                    detection: det_index,
                }
            });
        }

        // Step 4: Age unmatched tracks
        for row in unmatched_tracks {
            let track = &mut self.tracks[pool[row]];
            let previous = track.mark_missed(lifecycle);
            match (previous, track.state) {
                (TrackState::Active, TrackState::Lost) => {
                    debug!(track_id = track.id, frame_index, "track lost");
                    events.push(TrackEvent::Lost { track_id: track.id });
                }
                (_, TrackState::Closed) => {
                    info!(
                        track_id = track.id,
                        frame_index,
                        samples = track.volume_samples.len(),
                        "track closed"
                    );
                    events.push(TrackEvent::Closed { track_id: track.id });
                }
                _ => {}
            }
        }

        // Step 5: Init new tracks
        for col in unmatched_detections {
            let det_index = candidates[col];
            let id = self.next_id;
            self.next_id += 1;
            let track = Track::new(id, &detections[det_index], &self.kalman_filter);
            info!(
                track_id = id,
                frame_index,
                label = %detections[det_index].label,
                "track created"
            );
            self.tracks.push(track);
            events.push(TrackEvent::Created {
                track_id: id,
                detection: det_index,
            });
        }

        events
    }

    /// Advance one frame whose input was unusable. Tracks age; nothing is created.
    pub fn skip_frame(&mut self, frame_index: u64) -> Vec<TrackEvent> {
        self.update(frame_index, &[])
    }

    /// Force every ACTIVE or LOST track to CLOSED, keeping the samples collected so far.
    pub fn finish(&mut self) -> Vec<TrackEvent> {
        let lifecycle = self.config.lifecycle();
        let mut events = Vec::new();
        for track in self.tracks.iter_mut() {
            if track.force_close(lifecycle) != TrackState::Closed {
                events.push(TrackEvent::Closed { track_id: track.id });
            }
        }
        if !events.is_empty() {
            info!(closed = events.len(), "force-closed remaining tracks");
        }
        events
    }

    /// Hand over all tracks, consuming the manager.
    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }
}
