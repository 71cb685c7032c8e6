use serde::Serialize;

/// Track lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackState {
    /// Matched recently
    #[default]
    Active,
    /// Unmatched for at least `lost_after` frames, still eligible for redetection
    Lost,
    /// Finalized, never matched again
    Closed,
}

/// Event driving a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A detection was assigned to the track this frame.
    Matched,
    /// No detection this frame; `misses` is the consecutive unmatched count including this frame.
    Missed { misses: u32 },
    /// End of stream or cancellation.
    ForceClose,
}

/// Thresholds that drive the miss transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    /// Consecutive misses before ACTIVE becomes LOST (k).
    pub lost_after: u32,
    /// Consecutive misses a LOST track tolerates before it closes (K).
    pub redetection_window: u32,
}

impl TrackState {
    /// Next state for `trigger`. CLOSED is terminal.
    pub fn transition(self, trigger: Trigger, lifecycle: Lifecycle) -> TrackState {
        match (self, trigger) {
            (TrackState::Closed, _) => TrackState::Closed,
            (_, Trigger::ForceClose) => TrackState::Closed,
            (_, Trigger::Matched) => TrackState::Active,
            (TrackState::Active, Trigger::Missed { misses }) => {
                if misses > lifecycle.redetection_window {
                    TrackState::Closed
                } else if misses >= lifecycle.lost_after {
                    TrackState::Lost
                } else {
                    TrackState::Active
                }
            }
            (TrackState::Lost, Trigger::Missed { misses }) => {
                if misses > lifecycle.redetection_window {
                    TrackState::Closed
                } else {
                    TrackState::Lost
                }
            }
        }
    }

    /// Whether detections may still be assigned to a track in this state.
    pub fn is_matchable(self) -> bool {
        !matches!(self, TrackState::Closed)
    }
}
