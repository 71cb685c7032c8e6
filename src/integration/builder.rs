//! Builder for creating detections from box or disk regions.

use crate::integration::detector::RawDetection;
use crate::tracker::{Detection, Mask, Rect};

#[derive(Debug, Clone, Copy)]
enum Region {
    Rect(Rect),
    Disk { cx: f32, cy: f32, radius: f32 },
}

/// Builder for [`RawDetection`] and [`Detection`] values over an image of fixed size.
///
/// Adapters for box-only detectors and tests use it to rasterize a region into a mask.
#[derive(Debug, Clone)]
pub struct DetectionBuilder {
    height: usize,
    width: usize,
    region: Option<Region>,
    label: String,
    confidence: f32,
}

impl DetectionBuilder {
    /// Create a builder for an image of `height` x `width` pixels.
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            region: None,
            label: String::new(),
            confidence: 1.0,
        }
    }

    /// Set region in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.region = Some(Region::Rect(Rect::from_tlbr(x1, y1, x2, y2)));
        self
    }

    /// Set region in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.region = Some(Region::Rect(Rect::new(cx - w / 2.0, cy - h / 2.0, w, h)));
        self
    }

    /// Set a circular region, e.g. a plate-top view of a round item.
    pub fn disk(mut self, cx: f32, cy: f32, radius: f32) -> Self {
        self.region = Some(Region::Disk { cx, cy, radius });
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the confidence score.
    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    fn mask(&self) -> Mask {
        match self.region {
            None => Mask::empty(self.height, self.width),
            Some(Region::Rect(rect)) => Mask::from_rect(self.height, self.width, rect),
            Some(Region::Disk { cx, cy, radius }) => {
                Mask::from_disk(self.height, self.width, cx, cy, radius)
            }
        }
    }

    /// Build a frame-independent detection, as a [`crate::Detector`] returns it.
    pub fn build_raw(&self) -> RawDetection {
        RawDetection {
            mask: self.mask(),
            label: self.label.clone(),
            confidence: self.confidence,
        }
    }

    /// Build the final `Detection` for `frame_index`.
    pub fn build(&self, frame_index: u64) -> Detection {
        Detection::new(self.mask(), self.label.clone(), self.confidence, frame_index)
    }
}
