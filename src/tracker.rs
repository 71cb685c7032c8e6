mod kalman_filter;
mod mask;
mod matching;
mod rect;
mod track;
mod track_manager;
mod track_state;

pub use kalman_filter::KalmanFilter;
pub use mask::Mask;
pub use matching::{AssignmentResult, AssignmentStrategy, Detection, assign};
pub use rect::Rect;
pub use track::Track;
pub use track_manager::{TrackEvent, TrackManager, TrackerConfig};
pub use track_state::{Lifecycle, TrackState, Trigger};
