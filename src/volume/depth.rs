use ndarray::Array2;

/// Sentinel for pixels without a depth reading.
pub const INVALID_DEPTH: f32 = f32::NAN;

/// Per-pixel metric depth (meters from the camera), indexed `[row, col]`.
///
/// Non-finite and non-positive values are treated as invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    data: Array2<f32>,
}

impl DepthMap {
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// Constant-depth map, e.g. a flat plane facing the camera.
    pub fn filled(height: usize, width: usize, depth: f32) -> Self {
        Self::new(Array2::from_elem((height, width), depth))
    }

    /// (height, width)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<f32> {
        &mut self.data
    }

    #[inline]
    pub fn is_valid_depth(value: f32) -> bool {
        value.is_finite() && value > 0.0
    }

    /// Depth at a pixel, `None` when out of bounds or invalid.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        self.data
            .get((row, col))
            .copied()
            .filter(|&v| Self::is_valid_depth(v))
    }

    /// Fraction of pixels carrying a valid reading.
    pub fn valid_fraction(&self) -> f32 {
        let total = self.data.len();
        if total == 0 {
            return 0.0;
        }
        let valid = self.data.iter().filter(|&&v| Self::is_valid_depth(v)).count();
        valid as f32 / total as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_values() {
        let mut depth = DepthMap::filled(2, 2, 1.5);
        depth.data_mut()[[0, 0]] = INVALID_DEPTH;
        depth.data_mut()[[0, 1]] = -1.0;
        depth.data_mut()[[1, 0]] = f32::INFINITY;
        assert_eq!(depth.get(0, 0), None);
        assert_eq!(depth.get(0, 1), None);
        assert_eq!(depth.get(1, 0), None);
        assert_eq!(depth.get(1, 1), Some(1.5));
        assert_eq!(depth.get(5, 5), None);
        assert!((depth.valid_fraction() - 0.25).abs() < 1e-6);
    }
}
