use thiserror::Error;

/// Per-frame conditioning rejection. Recoverable: the caller holds its
/// last-good state for the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConditionError {
    #[error("detector confidence {confidence:.3} below floor {floor:.3}")]
    LowConfidence { confidence: f32, floor: f32 },
}

/// Calibration-only failures, surfaced to the calibration caller and
/// never silently retried.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CalibrationError {
    #[error("a calibration session is already in progress")]
    AlreadyCalibrating,
    #[error("point {point} has {have} samples, need {need}")]
    InsufficientSamples {
        point: usize,
        have: usize,
        need: usize,
    },
    #[error("calibration system is ill-conditioned (features too clustered)")]
    IllConditioned,
    #[error("fit residual {residual:.4} exceeds tolerance {tolerance:.4}")]
    ResidualTooHigh { residual: f32, tolerance: f32 },
}

/// Gesture training failures.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GestureError {
    #[error("gesture training needs {need} samples, got {have}")]
    InsufficientSamples { have: usize, need: usize },
    #[error("samples do not contain a full hand landmark set")]
    MalformedSamples,
}
