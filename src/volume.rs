//! Depth-based volume estimation.
//!
//! A [`VolumeEstimator`] turns one mask plus its frame's [`DepthMap`] into a
//! [`VolumeSample`], then stabilizes a track's samples with a robust
//! [`AggregationStatistic`]. The geometry is a pluggable [`VolumeModel`].

mod camera;
mod depth;
mod estimator;
mod model;
mod statistic;

pub use camera::CameraModel;
pub use depth::{DepthMap, INVALID_DEPTH};
pub use estimator::{VolumeConfig, VolumeEstimator, VolumeSample};
pub use model::{
    ColumnModel, DiskModel, FrustumModel, ReliefModel, SurfacePoint, VolumeModel, VolumeModelKind,
};
pub use statistic::AggregationStatistic;
