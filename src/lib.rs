//! Meal nutrition estimation from a short hand-held video.
//!
//! Food items are tracked across frames (surviving occlusion and re-entry), each
//! tracked region is turned into a volume from per-frame depth, and label plus
//! volume are resolved to mass and nutrients against reference tables.
//!
//! ```ignore
//! use mealtrack::{MealPipeline, NutritionResolver, PipelineConfig, ReferenceTables};
//!
//! let tables = ReferenceTables::from_path("nutrition.json".as_ref())?;
//! let config = PipelineConfig::from_path("mealtrack.toml".as_ref())?;
//! let resolver = NutritionResolver::new(&tables, config.nutrition.clone());
//! let mut pipeline = MealPipeline::new(&segmenter, &depth, &resolver, &config)?;
//! let report = pipeline.run(&mut video)?;
//! println!("{}", report.to_json()?);
//! ```

pub mod config;
pub mod error;
pub mod integration;
pub mod nutrition;
pub mod report;
pub mod text;
pub mod tracker;
pub mod volume;

pub use config::PipelineConfig;
pub use error::{ConfigError, PipelineError, ReferenceError, SourceError};
pub use integration::{
    DepthEstimator, DetectionBuilder, Detector, Frame, FrameSequence, FrameSource, Image,
    IntoDetections, MealPipeline, PipelineStats, RawDetection,
};
pub use nutrition::{
    MatchKind, NutrientBreakdown, NutritionConfig, NutritionRecord, NutritionResolver,
    ReferenceTables, Retriever, TokenOverlapRetriever,
};
pub use report::{Aggregator, DropReason, DroppedTrack, MealReport, ReportItem};
pub use tracker::{Detection, Mask, Track, TrackEvent, TrackManager, TrackState, TrackerConfig};
pub use volume::{AggregationStatistic, DepthMap, VolumeConfig, VolumeEstimator, VolumeSample};
