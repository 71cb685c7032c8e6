//! Constant-velocity Kalman filter over mask centroids.
//!
//! State is `[cx, cy, vx, vy]`, measurement is `[cx, cy]`. Noise is scaled by the
//! object's characteristic size (square root of its mask area) so small and large
//! items move with comparable relative uncertainty.

use nalgebra::{Matrix2x4, Matrix4, Vector2, Vector4};

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Matrix4<f64>,
    update_mat: Matrix2x4<f64>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let mut motion_mat = Matrix4::identity();
        motion_mat[(0, 2)] = 1.0;
        motion_mat[(1, 3)] = 1.0;

        let update_mat = Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0,
        );

        Self {
            motion_mat,
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }

    pub fn initiate(&self, measurement: [f64; 2], scale: f64) -> (Vector4<f64>, Matrix4<f64>) {
        let mean = Vector4::new(measurement[0], measurement[1], 0.0, 0.0);
        let p = 2.0 * self.std_weight_position * scale;
        let v = 10.0 * self.std_weight_velocity * scale;
        let cov = Matrix4::from_diagonal(&Vector4::new(p * p, p * p, v * v, v * v));
        (mean, cov)
    }

    pub fn predict(
        &self,
        mean: &Vector4<f64>,
        covariance: &Matrix4<f64>,
        scale: f64,
    ) -> (Vector4<f64>, Matrix4<f64>) {
        let p = self.std_weight_position * scale;
        let v = self.std_weight_velocity * scale;
        let motion_cov = Matrix4::from_diagonal(&Vector4::new(p * p, p * p, v * v, v * v));

        let new_mean = self.motion_mat * mean;
        let new_covariance = self.motion_mat * covariance * self.motion_mat.transpose() + motion_cov;
        (new_mean, new_covariance)
    }

    pub fn update(
        &self,
        mean: &Vector4<f64>,
        covariance: &Matrix4<f64>,
        measurement: [f64; 2],
        scale: f64,
    ) -> (Vector4<f64>, Matrix4<f64>) {
        let r = self.std_weight_position * scale;
        let innovation_cov = nalgebra::Matrix2::from_diagonal(&Vector2::new(r * r, r * r));

        let projected_mean = self.update_mat * mean;
        let projected_cov =
            self.update_mat * covariance * self.update_mat.transpose() + innovation_cov;

        let Some(s_inv) = projected_cov.try_inverse() else {
            // Degenerate covariance: trust the measurement position outright.
            let mut snapped = *mean;
            snapped[0] = measurement[0];
            snapped[1] = measurement[1];
            return (snapped, *covariance);
        };

        let innovation = Vector2::new(measurement[0], measurement[1]) - projected_mean;
        let kalman_gain = covariance * self.update_mat.transpose() * s_inv;

        let new_mean = mean + kalman_gain * innovation;
        let new_covariance = covariance - kalman_gain * projected_cov * kalman_gain.transpose();
        (new_mean, new_covariance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initiate() {
        let kf = KalmanFilter::new();
        let (mean, cov) = kf.initiate([100.0, 200.0], 20.0);
        assert_eq!(mean[0], 100.0);
        assert_eq!(mean[1], 200.0);
        assert_eq!(mean[2], 0.0);
        assert!(cov[(0, 0)] > 0.0);
    }

    #[test]
    fn test_learns_constant_velocity() {
        let kf = KalmanFilter::new();
        let (mut mean, mut cov) = kf.initiate([0.0, 0.0], 20.0);
        for step in 1..=20 {
            let (m, c) = kf.predict(&mean, &cov, 20.0);
            let (m, c) = kf.update(&m, &c, [2.0 * step as f64, 0.0], 20.0);
            mean = m;
            cov = c;
        }
        assert!((mean[2] - 2.0).abs() < 0.5, "vx = {}", mean[2]);
        assert!(mean[3].abs() < 1e-6);
    }
}
