use crate::error::CalibrationError;
use api::LandmarkFrame;
use glam::{Mat3, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Number of screen targets in the calibration grid.
pub const TARGET_POINTS: usize = 9;

/// Standard 9-point grid: corners, edge midpoints, center, in normalized
/// screen coordinates.
pub fn target_grid() -> [Vec2; TARGET_POINTS] {
    [
        Vec2::new(0.1, 0.1),
        Vec2::new(0.5, 0.1),
        Vec2::new(0.9, 0.1),
        Vec2::new(0.1, 0.5),
        Vec2::new(0.5, 0.5),
        Vec2::new(0.9, 0.5),
        Vec2::new(0.1, 0.9),
        Vec2::new(0.5, 0.9),
        Vec2::new(0.9, 0.9),
    ]
}

/// Eye feature for calibration and estimation: the mean of the frame's
/// iris-center landmarks projected to the image plane. Returns `None`
/// for an empty frame.
pub fn eye_feature(frame: &LandmarkFrame) -> Option<Vec2> {
    if frame.points.is_empty() {
        return None;
    }
    let sum: Vec2 = frame.points.iter().map(|p| Vec2::new(p.x, p.y)).sum();
    Some(sum / frame.points.len() as f32)
}

/// One target of the grid plus the features sampled while the user
/// fixated it. Retained after fitting as provenance for re-calibration
/// diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub target: Vec2,
    pub samples: Vec<Vec2>,
}

impl CalibrationPoint {
    pub fn new(target: Vec2) -> Self {
        Self {
            target,
            samples: Vec::new(),
        }
    }

    pub fn mean_feature(&self) -> Option<Vec2> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().copied().sum::<Vec2>() / self.samples.len() as f32)
    }
}

/// Fitted affine mapping from eye-feature space to normalized screen
/// space: `screen_axis = coeff · [fx, fy, 1]` per axis, with the fit's
/// RMS residual as the accuracy estimate. Replaced wholesale on
/// re-calibration, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationModel {
    coeff_x: Vec3,
    coeff_y: Vec3,
    pub residual: f32,
}

impl CalibrationModel {
    /// Least-squares fit over the collected points via the 3x3 normal
    /// equations. Fails typed for an ill-conditioned system or a
    /// residual above tolerance.
    pub fn fit(points: &[CalibrationPoint], tolerance: f32) -> Result<Self, CalibrationError> {
        let mut ata = Mat3::ZERO;
        let mut atx = Vec3::ZERO;
        let mut aty = Vec3::ZERO;
        let mut rows = 0usize;

        for point in points {
            for sample in &point.samples {
                let row = Vec3::new(sample.x, sample.y, 1.0);
                ata += outer(row, row);
                atx += row * point.target.x;
                aty += row * point.target.y;
                rows += 1;
            }
        }

        if rows < TARGET_POINTS {
            return Err(CalibrationError::InsufficientSamples {
                point: 0,
                have: rows,
                need: TARGET_POINTS,
            });
        }

        if ata.determinant().abs() < 1e-9 {
            return Err(CalibrationError::IllConditioned);
        }

        let inv = ata.inverse();
        let model = Self {
            coeff_x: inv * atx,
            coeff_y: inv * aty,
            residual: 0.0,
        };

        let mut sq_err = 0.0f32;
        for point in points {
            for sample in &point.samples {
                sq_err += model.map_unclamped(*sample).distance_squared(point.target);
            }
        }
        let residual = (sq_err / rows as f32).sqrt();

        if !residual.is_finite() || residual > tolerance {
            return Err(CalibrationError::ResidualTooHigh {
                residual,
                tolerance,
            });
        }

        Ok(Self { residual, ..model })
    }

    fn map_unclamped(&self, feature: Vec2) -> Vec2 {
        let v = Vec3::new(feature.x, feature.y, 1.0);
        Vec2::new(self.coeff_x.dot(v), self.coeff_y.dot(v))
    }

    /// Map an eye feature to a normalized screen coordinate, clamped to
    /// the visible range.
    pub fn map(&self, feature: Vec2) -> Vec2 {
        self.map_unclamped(feature).clamp(Vec2::ZERO, Vec2::ONE)
    }
}

// a · bᵀ, column-major: column j is a scaled by b's j-th component.
fn outer(a: Vec3, b: Vec3) -> Mat3 {
    Mat3::from_cols(a * b.x, a * b.y, a * b.z)
}
