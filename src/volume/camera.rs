use serde::Deserialize;

/// Pinhole camera described by its angular resolution.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CameraModel {
    /// Angle subtended by one pixel column, radians
    pub horizontal_rad_per_px: f64,
    /// Angle subtended by one pixel row, radians
    pub vertical_rad_per_px: f64,
}

impl Default for CameraModel {
    /// Typical phone main camera: ~66 degree horizontal FOV over 1920 columns.
    fn default() -> Self {
        Self::from_field_of_view(66.0, 66.0 * 1080.0 / 1920.0, 1920, 1080)
    }
}

impl CameraModel {
    pub fn new(horizontal_rad_per_px: f64, vertical_rad_per_px: f64) -> Self {
        Self {
            horizontal_rad_per_px,
            vertical_rad_per_px,
        }
    }

    /// Derive angular resolution from field of view (degrees) and image size.
    pub fn from_field_of_view(hfov_deg: f64, vfov_deg: f64, width: u32, height: u32) -> Self {
        Self {
            horizontal_rad_per_px: hfov_deg.to_radians() / width.max(1) as f64,
            vertical_rad_per_px: vfov_deg.to_radians() / height.max(1) as f64,
        }
    }

    /// Real-world area in m² covered by one pixel at `depth` meters.
    #[inline]
    pub fn pixel_footprint(&self, depth: f64) -> f64 {
        let w = 2.0 * depth * (self.horizontal_rad_per_px / 2.0).tan();
        let h = 2.0 * depth * (self.vertical_rad_per_px / 2.0).tan();
        w * h
    }

    pub fn is_valid(&self) -> bool {
        let ok = |v: f64| v.is_finite() && v > 0.0 && v < std::f64::consts::PI;
        ok(self.horizontal_rad_per_px) && ok(self.vertical_rad_per_px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint_grows_with_depth_squared() {
        let cam = CameraModel::new(0.001, 0.001);
        let near = cam.pixel_footprint(1.0);
        let far = cam.pixel_footprint(2.0);
        assert!((far / near - 4.0).abs() < 1e-9);
        assert!((near - 1e-6).abs() < 1e-10);
    }

    #[test]
    fn test_from_field_of_view() {
        let cam = CameraModel::from_field_of_view(90.0, 45.0, 900, 450);
        assert!((cam.horizontal_rad_per_px - 0.1_f64.to_radians()).abs() < 1e-12);
        assert!((cam.vertical_rad_per_px - 0.1_f64.to_radians()).abs() < 1e-12);
        assert!(cam.is_valid());
        assert!(!CameraModel::new(0.0, 0.001).is_valid());
    }
}
