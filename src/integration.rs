//! Integration module for connecting external backends to the core.
//!
//! This module provides the traits a frame source, a food segmenter and a depth
//! estimator implement, and the [`MealPipeline`] that drives them frame by frame.

mod builder;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detector::{
    DepthEstimator, Detector, Frame, FrameSequence, FrameSource, Image, IntoDetections,
    RawDetection,
};
pub use pipeline::{MealPipeline, PipelineStats};
