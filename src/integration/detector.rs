//! Traits for the external collaborators feeding the pipeline.

use std::collections::VecDeque;

use ndarray::Array3;

use crate::error::SourceError;
use crate::tracker::{Detection, Mask};
use crate::volume::DepthMap;

/// Decoded frame pixels, `[row, col, channel]`.
pub type Image = Array3<u8>;

/// One decoded video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub image: Image,
    /// Seconds from the start of the video
    pub timestamp: f64,
}

impl Frame {
    pub fn new(index: u64, image: Image, timestamp: f64) -> Self {
        Self {
            index,
            image,
            timestamp,
        }
    }

    /// (height, width)
    pub fn dimensions(&self) -> (usize, usize) {
        let (h, w, _) = self.image.dim();
        (h, w)
    }
}

/// Ordered supply of frames.
pub trait FrameSource {
    /// Next frame, `Ok(None)` at end of stream.
    fn next(&mut self) -> Result<Option<Frame>, SourceError>;
}

/// In-memory frame source, e.g. for pre-decoded clips.
#[derive(Debug, Default)]
pub struct FrameSequence {
    frames: VecDeque<Result<Frame, SourceError>>,
}

impl FrameSequence {
    pub fn new(frames: impl IntoIterator<Item = Result<Frame, SourceError>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn from_frames(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self::new(frames.into_iter().map(Ok))
    }
}

impl FrameSource for FrameSequence {
    fn next(&mut self) -> Result<Option<Frame>, SourceError> {
        self.frames.pop_front().transpose()
    }
}

/// A candidate food region as returned by a segmenter, before it is bound to a frame.
#[derive(Debug, Clone)]
pub struct RawDetection {
    pub mask: Mask,
    pub label: String,
    pub confidence: f32,
}

/// Helper trait for converting model-specific outputs to `Detection`.
pub trait IntoDetections {
    fn into_detections(self, frame_index: u64) -> Vec<Detection>;
}

impl IntoDetections for Vec<RawDetection> {
    fn into_detections(self, frame_index: u64) -> Vec<Detection> {
        self.into_iter()
            .map(|d| Detection::new(d.mask, d.label, d.confidence, frame_index))
            .collect()
    }
}

/// Food detector/segmenter backend.
///
/// Implementations are shared by reference across worker threads, so any
/// batching or asynchronous machinery lives behind `&self`.
///
/// # Example
///
/// ```ignore
/// use mealtrack::{Detector, Image, RawDetection};
///
/// struct MySegmenter {
///     // Your model here
/// }
///
/// impl Detector for MySegmenter {
///     type Error = std::io::Error;
///
///     fn detect(&self, image: &Image) -> Result<Vec<RawDetection>, Self::Error> {
///         // Run inference and return masks with labels
///         Ok(vec![])
///     }
/// }
/// ```
pub trait Detector: Sync {
    type Error: std::error::Error + Send;

    fn detect(&self, image: &Image) -> Result<Vec<RawDetection>, Self::Error>;
}

/// Monocular metric depth backend.
///
/// The returned map must match the image's pixel dimensions; invalid pixels
/// carry [`crate::volume::INVALID_DEPTH`].
pub trait DepthEstimator: Sync {
    type Error: std::error::Error + Send;

    fn estimate(&self, image: &Image) -> Result<DepthMap, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_sequence_yields_in_order() {
        let image = Image::zeros((2, 3, 3));
        let mut source = FrameSequence::new([
            Ok(Frame::new(0, image.clone(), 0.0)),
            Err(SourceError::Corrupt {
                frame_index: 1,
                reason: "bad checksum".into(),
            }),
            Ok(Frame::new(2, image, 0.066)),
        ]);
        assert_eq!(source.next().unwrap().unwrap().dimensions(), (2, 3));
        assert!(matches!(source.next(), Err(SourceError::Corrupt { frame_index: 1, .. })));
        assert_eq!(source.next().unwrap().unwrap().index, 2);
        assert!(source.next().unwrap().is_none());
    }
}
