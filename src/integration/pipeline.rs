//! MealPipeline: frame loop from source to report.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, SourceError};
use crate::nutrition::{NutritionResolver, Retriever, TokenOverlapRetriever};
use crate::report::{Aggregator, MealReport};
use crate::tracker::{TrackEvent, TrackManager};
use crate::volume::{VolumeEstimator, VolumeSample};

use super::{DepthEstimator, Detector, Frame, FrameSource, IntoDetections};

/// Counters describing one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_processed: u64,
    /// Frames whose input was unusable; tracks still aged
    pub frames_skipped: u64,
    /// Frames dropped by `frame_stride`
    pub frames_discarded: u64,
    pub samples_accepted: u64,
    pub samples_rejected: u64,
}

/// Runs detection, tracking and volume sampling frame by frame, then builds the report.
///
/// The detector, depth estimator and resolver are shared handles constructed once by
/// the caller; the pipeline owns only the per-video state.
pub struct MealPipeline<'a, D, E, R = TokenOverlapRetriever> {
    detector: &'a D,
    depth_estimator: &'a E,
    resolver: &'a NutritionResolver<'a, R>,
    tracker: TrackManager,
    estimator: VolumeEstimator,
    frame_stride: u64,
    max_frames: Option<u64>,
    frames_seen: u64,
    stats: PipelineStats,
}

impl<'a, D, E, R> MealPipeline<'a, D, E, R>
where
    D: Detector,
    E: DepthEstimator,
    R: Retriever,
{
    pub fn new(
        detector: &'a D,
        depth_estimator: &'a E,
        resolver: &'a NutritionResolver<'a, R>,
        config: &PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            detector,
            depth_estimator,
            resolver,
            tracker: TrackManager::new(config.tracker.clone()),
            estimator: VolumeEstimator::new(&config.volume),
            frame_stride: config.frame_stride.max(1) as u64,
            max_frames: config.max_frames,
            frames_seen: 0,
            stats: PipelineStats::default(),
        })
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn tracker(&self) -> &TrackManager {
        &self.tracker
    }

    pub fn estimator(&self) -> &VolumeEstimator {
        &self.estimator
    }

    /// Consume `source` to its end and build the report.
    ///
    /// `frame_stride` thins decoded and corrupt frames alike; a corrupt frame on a
    /// kept slot is skipped. A decode failure ends the stream early on any slot and
    /// the report is built from what was collected. Only an unopenable source is an
    /// error. `max_frames` counts processed and skipped frames.
    pub fn run<S: FrameSource>(&mut self, source: &mut S) -> Result<MealReport, PipelineError> {
        loop {
            if self.max_frames.is_some_and(|max| self.frames_consumed() >= max) {
                info!(max_frames = ?self.max_frames, "frame limit reached");
                break;
            }

            match source.next() {
                Ok(Some(frame)) => {
                    if self.take_slot() {
                        self.process_frame(&frame);
                    }
                }
                Ok(None) => break,
                Err(SourceError::Corrupt {
                    frame_index,
                    reason,
                }) => {
                    if self.take_slot() {
                        warn!(frame_index, %reason, "corrupt frame skipped");
                        self.skip_frame(frame_index);
                    }
                }
                Err(SourceError::Decode(reason)) => {
                    warn!(%reason, "frame decoding failed, finalizing with collected samples");
                    break;
                }
                Err(err @ SourceError::Open(_)) => return Err(err.into()),
            }
        }
        Ok(self.finish())
    }

    /// Advance the stride counter; `false` when this slot is discarded.
    fn take_slot(&mut self) -> bool {
        let keep = self.frames_seen % self.frame_stride == 0;
        self.frames_seen += 1;
        if !keep {
            self.stats.frames_discarded += 1;
        }
        keep
    }

    fn frames_consumed(&self) -> u64 {
        self.stats.frames_processed + self.stats.frames_skipped
    }

    /// Detect, track and sample one frame.
    pub fn process_frame(&mut self, frame: &Frame) -> Vec<TrackEvent> {
        let (detections, depth) = rayon::join(
            || self.detector.detect(&frame.image),
            || self.depth_estimator.estimate(&frame.image),
        );

        let detections = match detections {
            Ok(raw) => raw.into_detections(frame.index),
            Err(err) => {
                warn!(frame_index = frame.index, error = %err, "detector failed, frame skipped");
                return self.skip_frame(frame.index);
            }
        };
        let depth = match depth {
            Ok(depth) if depth.shape() == frame.dimensions() => depth,
            Ok(depth) => {
                warn!(
                    frame_index = frame.index,
                    depth_shape = ?depth.shape(),
                    image_shape = ?frame.dimensions(),
                    "depth map size mismatch, frame skipped"
                );
                return self.skip_frame(frame.index);
            }
            Err(err) => {
                warn!(frame_index = frame.index, error = %err, "depth estimation failed, frame skipped");
                return self.skip_frame(frame.index);
            }
        };

        let events = self.tracker.update(frame.index, &detections);
        self.stats.frames_processed += 1;

        let matched: Vec<(u64, usize)> = events
            .iter()
            .filter_map(|e| e.detection().map(|d| (e.track_id(), d)))
            .collect();

        let tracker = &self.tracker;
        let estimator = &self.estimator;
        let samples: Vec<(u64, Option<VolumeSample>)> = matched
            .par_iter()
            .map(|&(track_id, det)| {
                let sample = tracker
                    .track(track_id)
                    .and_then(|track| estimator.estimate(track, &detections[det].mask, &depth));
                (track_id, sample)
            })
            .collect();

        self.record_samples(samples);
        debug!(
            frame_index = frame.index,
            detections = detections.len(),
            events = events.len(),
            "frame processed"
        );
        events
    }

    fn record_samples(&mut self, samples: Vec<(u64, Option<VolumeSample>)>) {
        for (track_id, sample) in samples {
            match (sample, self.tracker.track_mut(track_id)) {
                (Some(sample), Some(track)) => {
                    track.push_sample(sample);
                    self.stats.samples_accepted += 1;
                }
                _ => self.stats.samples_rejected += 1,
            }
        }
    }

    /// Age tracks for a frame whose input could not be used.
    pub fn skip_frame(&mut self, frame_index: u64) -> Vec<TrackEvent> {
        self.stats.frames_skipped += 1;
        self.tracker.skip_frame(frame_index)
    }

    /// Close every open track and aggregate the meal.
    pub fn finish(&mut self) -> MealReport {
        self.tracker.finish();
        let report =
            Aggregator::new(&self.estimator, self.resolver).aggregate(self.tracker.tracks());
        info!(
            frames_processed = self.stats.frames_processed,
            frames_skipped = self.stats.frames_skipped,
            samples_accepted = self.stats.samples_accepted,
            items = report.items.len(),
            "pipeline finished"
        );
        report
    }
}
