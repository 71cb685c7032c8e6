//! Geometric models turning a masked depth surface into a volume.
//!
//! The right geometry for food on a plate is not settled, so the model is a
//! strategy chosen by configuration. Every model receives the visible surface as
//! per-pixel footprints and depths and returns cubic meters.

use serde::Deserialize;

use crate::volume::statistic::percentile_sorted;

/// One valid pixel of the masked surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    /// Real-world area covered by the pixel, m²
    pub area_m2: f64,
    /// Distance from the camera, m
    pub depth_m: f64,
}

pub trait VolumeModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Volume in m³ of the object whose visible surface is `points`. Never negative.
    fn integrate(&self, points: &[SurfacePoint]) -> f64;
}

/// Selectable model, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeModelKind {
    /// Reference-plane volume. The only model that recovers area × depth for a flat
    /// plane facing the camera; [`VolumeModelKind::Relief`] and the others measure
    /// height above the plate and give zero there.
    Column,
    /// Height above the supporting surface.
    #[default]
    Relief,
    Disk,
    Frustum,
}

impl VolumeModelKind {
    pub fn build(self, support_percentile: f64) -> Box<dyn VolumeModel> {
        match self {
            VolumeModelKind::Column => Box::new(ColumnModel),
            VolumeModelKind::Relief => Box::new(ReliefModel { support_percentile }),
            VolumeModelKind::Disk => Box::new(DiskModel { support_percentile }),
            VolumeModelKind::Frustum => Box::new(FrustumModel { support_percentile }),
        }
    }
}

/// Σ area × depth: every pixel is a column reaching back to the camera's reference plane.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnModel;

impl VolumeModel for ColumnModel {
    fn name(&self) -> &'static str {
        "column"
    }

    fn integrate(&self, points: &[SurfacePoint]) -> f64 {
        points.iter().map(|p| p.area_m2 * p.depth_m).sum::<f64>().max(0.0)
    }
}

/// Height field above the supporting surface.
///
/// The support plane sits at the `support_percentile` depth of the masked pixels
/// (the rim of the item, where it meets the plate). Each pixel contributes its
/// footprint times its height above that plane.
#[derive(Debug, Clone, Copy)]
pub struct ReliefModel {
    pub support_percentile: f64,
}

impl VolumeModel for ReliefModel {
    fn name(&self) -> &'static str {
        "relief"
    }

    fn integrate(&self, points: &[SurfacePoint]) -> f64 {
        let Some(support) = support_depth(points, self.support_percentile) else {
            return 0.0;
        };
        points
            .iter()
            .map(|p| p.area_m2 * (support - p.depth_m).max(0.0))
            .sum()
    }
}

/// Flat disk: total footprint × peak height above the support plane.
#[derive(Debug, Clone, Copy)]
pub struct DiskModel {
    pub support_percentile: f64,
}

impl VolumeModel for DiskModel {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn integrate(&self, points: &[SurfacePoint]) -> f64 {
        let Some((_, height)) = support_and_height(points, self.support_percentile) else {
            return 0.0;
        };
        let base: f64 = points.iter().map(|p| p.area_m2).sum();
        (base * height).max(0.0)
    }
}

/// Frustum between the full footprint and the footprint above half height.
#[derive(Debug, Clone, Copy)]
pub struct FrustumModel {
    pub support_percentile: f64,
}

impl VolumeModel for FrustumModel {
    fn name(&self) -> &'static str {
        "frustum"
    }

    fn integrate(&self, points: &[SurfacePoint]) -> f64 {
        let Some((support, height)) = support_and_height(points, self.support_percentile) else {
            return 0.0;
        };
        if height <= 0.0 {
            return 0.0;
        }
        let base: f64 = points.iter().map(|p| p.area_m2).sum();
        let top: f64 = points
            .iter()
            .filter(|p| support - p.depth_m >= height / 2.0)
            .map(|p| p.area_m2)
            .sum();
        (height / 3.0 * (base + top + (base * top).sqrt())).max(0.0)
    }
}

fn support_depth(points: &[SurfacePoint], percentile: f64) -> Option<f64> {
    let mut depths: Vec<f64> = points.iter().map(|p| p.depth_m).collect();
    depths.sort_by(f64::total_cmp);
    percentile_sorted(&depths, percentile)
}

fn support_and_height(points: &[SurfacePoint], percentile: f64) -> Option<(f64, f64)> {
    let support = support_depth(points, percentile)?;
    let nearest = points.iter().map(|p| p.depth_m).fold(f64::INFINITY, f64::min);
    Some((support, (support - nearest).max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10x10 grid of 1 cm² pixels: a 2x2 block 3 cm proud of a plate at 0.5 m.
    fn bump() -> Vec<SurfacePoint> {
        let mut points = Vec::new();
        for r in 0..10 {
            for c in 0..10 {
                let raised = (4..6).contains(&r) && (4..6).contains(&c);
                points.push(SurfacePoint {
                    area_m2: 1e-4,
                    depth_m: if raised { 0.47 } else { 0.5 },
                });
            }
        }
        points
    }

    #[test]
    fn test_column_model() {
        let v = ColumnModel.integrate(&bump());
        let expected = 96.0 * 1e-4 * 0.5 + 4.0 * 1e-4 * 0.47;
        assert!((v - expected).abs() < 1e-12);
    }

    #[test]
    fn test_relief_model_measures_height_above_plate() {
        let v = ReliefModel {
            support_percentile: 0.9,
        }
        .integrate(&bump());
        // 4 cm² × 3 cm = 12 cm³
        assert!((v - 12e-6).abs() < 1e-9);
    }

    #[test]
    fn test_disk_and_frustum() {
        let disk = DiskModel {
            support_percentile: 0.9,
        }
        .integrate(&bump());
        assert!((disk - 100e-4 * 0.03).abs() < 1e-9);

        let frustum = FrustumModel {
            support_percentile: 0.9,
        }
        .integrate(&bump());
        let (base, top, h) = (100e-4_f64, 4e-4_f64, 0.03_f64);
        let expected = h / 3.0 * (base + top + (base * top).sqrt());
        assert!((frustum - expected).abs() < 1e-9);
        assert!(frustum < disk);
    }

    #[test]
    fn test_flat_surface_has_no_relief() {
        let flat = vec![
            SurfacePoint {
                area_m2: 1e-4,
                depth_m: 0.5
            };
            20
        ];
        for kind in [
            VolumeModelKind::Relief,
            VolumeModelKind::Disk,
            VolumeModelKind::Frustum,
        ] {
            assert_eq!(kind.build(0.9).integrate(&flat), 0.0, "{kind:?}");
        }
        let column = VolumeModelKind::Column.build(0.9).integrate(&flat);
        assert!((column - 20.0 * 1e-4 * 0.5).abs() < 1e-12);
        assert_eq!(ColumnModel.integrate(&[]), 0.0);
    }
}
