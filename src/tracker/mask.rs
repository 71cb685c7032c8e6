//! Per-pixel segmentation mask.

use ndarray::Array2;

use crate::tracker::rect::Rect;

/// Boolean region over an image, indexed `[row, col]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    data: Array2<bool>,
}

impl Mask {
    pub fn new(data: Array2<bool>) -> Self {
        Self { data }
    }

    pub fn empty(height: usize, width: usize) -> Self {
        Self::new(Array2::from_elem((height, width), false))
    }

    /// Mask covering every pixel whose center lies inside `rect`, clipped to the image.
    pub fn from_rect(height: usize, width: usize, rect: Rect) -> Self {
        let data = Array2::from_shape_fn((height, width), |(r, c)| {
            rect.contains_point(c as f32 + 0.5, r as f32 + 0.5)
        });
        Self::new(data)
    }

    /// Mask covering a disk of `radius` pixels around `(cx, cy)`.
    pub fn from_disk(height: usize, width: usize, cx: f32, cy: f32, radius: f32) -> Self {
        let r2 = radius * radius;
        let data = Array2::from_shape_fn((height, width), |(r, c)| {
            let dx = c as f32 + 0.5 - cx;
            let dy = r as f32 + 0.5 - cy;
            dx * dx + dy * dy <= r2
        });
        Self::new(data)
    }

    /// (height, width)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array2<bool> {
        &self.data
    }

    #[inline]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.data.get((row, col)).copied().unwrap_or(false)
    }

    /// Number of pixels in the region.
    pub fn area(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Iterate over `(row, col)` of every pixel in the region.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.data
            .indexed_iter()
            .filter_map(|(idx, &v)| if v { Some(idx) } else { None })
    }

    /// Pixel-center centroid as `(x, y)`, or `None` for an empty mask.
    pub fn centroid(&self) -> Option<(f32, f32)> {
        let (mut sx, mut sy, mut n) = (0.0f64, 0.0f64, 0usize);
        for (r, c) in self.pixels() {
            sx += c as f64 + 0.5;
            sy += r as f64 + 0.5;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(((sx / n as f64) as f32, (sy / n as f64) as f32))
    }

    /// Tight bounding box around the region.
    pub fn bounding_rect(&self) -> Option<Rect> {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for (r, c) in self.pixels() {
            bounds = Some(match bounds {
                None => (c, r, c, r),
                Some((x1, y1, x2, y2)) => (x1.min(c), y1.min(r), x2.max(c), y2.max(r)),
            });
        }
        bounds.map(|(x1, y1, x2, y2)| {
            Rect::from_tlbr(x1 as f32, y1 as f32, (x2 + 1) as f32, (y2 + 1) as f32)
        })
    }

    /// IoU between this mask moved by `(dx, dy)` pixels and `other`.
    ///
    /// Pixels shifted outside `other` still count toward the union.
    pub fn iou_shifted(&self, other: &Mask, dx: f32, dy: f32) -> f32 {
        let (sx, sy) = (dx.round() as isize, dy.round() as isize);
        let area_self = self.area();
        let area_other = other.area();
        if area_self == 0 || area_other == 0 {
            return 0.0;
        }
        if let (Some(a), Some(b)) = (self.bounding_rect(), other.bounding_rect()) {
            if a.translated(sx as f32, sy as f32).intersection_area(&b) <= 0.0 {
                return 0.0;
            }
        }

        let mut inter = 0usize;
        for (r, c) in self.pixels() {
            let (tr, tc) = (r as isize + sy, c as isize + sx);
            if tr >= 0 && tc >= 0 && other.contains(tr as usize, tc as usize) {
                inter += 1;
            }
        }
        let union = area_self + area_other - inter;
        inter as f32 / union as f32
    }

    pub fn iou(&self, other: &Mask) -> f32 {
        self.iou_shifted(other, 0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_mask_area_and_centroid() {
        let mask = Mask::from_rect(20, 20, Rect::new(2.0, 4.0, 6.0, 8.0));
        assert_eq!(mask.area(), 48);
        let (cx, cy) = mask.centroid().unwrap();
        assert!((cx - 5.0).abs() < 1e-5);
        assert!((cy - 8.0).abs() < 1e-5);
        assert_eq!(mask.bounding_rect(), Some(Rect::new(2.0, 4.0, 6.0, 8.0)));
    }

    #[test]
    fn test_empty_mask() {
        let mask = Mask::empty(5, 5);
        assert!(mask.is_empty());
        assert_eq!(mask.centroid(), None);
        assert_eq!(mask.bounding_rect(), None);
        assert_eq!(mask.iou(&mask), 0.0);
    }

    #[test]
    fn test_iou_shifted_recovers_motion() {
        let a = Mask::from_rect(40, 40, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = Mask::from_rect(40, 40, Rect::new(5.0, 0.0, 10.0, 10.0));
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
        assert!((a.iou_shifted(&b, 5.0, 0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_disjoint_masks() {
        let a = Mask::from_disk(50, 50, 10.0, 10.0, 5.0);
        let b = Mask::from_disk(50, 50, 40.0, 40.0, 5.0);
        assert_eq!(a.iou(&b), 0.0);
    }
}
