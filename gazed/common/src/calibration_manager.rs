use crate::calibration::{target_grid, CalibrationModel, CalibrationPoint, TARGET_POINTS};
use crate::config::CalibrationConfig;
use crate::error::CalibrationError;
use anyhow::{Context, Result};
use glam::Vec2;
use log::{info, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

const CALIBRATION_FILENAME: &str = "calibration.json";

/// Guided calibration lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    Idle,
    Collecting { point: usize },
    Fitting,
    Complete,
    Failed,
}

/// Runs the 9-point procedure and owns the active transform.
///
/// The model is only ever replaced as a whole on `Complete`; readers of a
/// clone taken before the swap keep a consistent view for their in-flight
/// cycle.
pub struct CalibrationManager {
    phase: CalibrationPhase,
    points: Vec<CalibrationPoint>,
    model: Option<CalibrationModel>,
    samples_per_point: usize,
    residual_tolerance: f32,
    storage_path: PathBuf,
}

impl CalibrationManager {
    pub fn new(storage_dir: PathBuf, config: &CalibrationConfig) -> Self {
        Self {
            phase: CalibrationPhase::Idle,
            points: Vec::new(),
            model: None,
            samples_per_point: config.samples_per_point.max(1),
            residual_tolerance: config.residual_tolerance,
            storage_path: storage_dir.join(CALIBRATION_FILENAME),
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn model(&self) -> Option<&CalibrationModel> {
        self.model.as_ref()
    }

    /// Sample provenance of the last session, for diagnostics.
    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    /// Start (or restart) a session. Clears any prior in-progress
    /// samples; the active model stays valid until a new fit completes.
    pub fn begin(&mut self) -> Result<(), CalibrationError> {
        if matches!(
            self.phase,
            CalibrationPhase::Collecting { .. } | CalibrationPhase::Fitting
        ) {
            return Err(CalibrationError::AlreadyCalibrating);
        }
        self.points = target_grid().into_iter().map(CalibrationPoint::new).collect();
        self.phase = CalibrationPhase::Collecting { point: 0 };
        info!("Calibration started: {} targets", TARGET_POINTS);
        Ok(())
    }

    /// Abort an in-progress session without touching the active model.
    pub fn cancel(&mut self) {
        if matches!(
            self.phase,
            CalibrationPhase::Collecting { .. } | CalibrationPhase::Fitting
        ) {
            info!("Calibration cancelled");
            self.phase = CalibrationPhase::Idle;
        }
    }

    /// Screen target the user should fixate right now.
    pub fn current_target(&self) -> Option<Vec2> {
        match self.phase {
            CalibrationPhase::Collecting { point } => self.points.get(point).map(|p| p.target),
            _ => None,
        }
    }

    /// Fraction of required samples collected across all targets.
    pub fn progress(&self) -> f32 {
        let need = (TARGET_POINTS * self.samples_per_point) as f32;
        let have: usize = self
            .points
            .iter()
            .map(|p| p.samples.len().min(self.samples_per_point))
            .sum();
        (have as f32 / need).clamp(0.0, 1.0)
    }

    /// Feed one conditioned eye feature to the active target. Advances
    /// to the next target once the minimum count is reached; after the
    /// last target the fit runs and the phase lands on `Complete` or
    /// `Failed`.
    pub fn push_sample(&mut self, feature: Vec2) -> Result<CalibrationPhase, CalibrationError> {
        let CalibrationPhase::Collecting { point } = self.phase else {
            return Ok(self.phase);
        };

        self.points[point].samples.push(feature);
        if self.points[point].samples.len() >= self.samples_per_point {
            if point + 1 < self.points.len() {
                self.phase = CalibrationPhase::Collecting { point: point + 1 };
            } else {
                self.phase = CalibrationPhase::Fitting;
                return self.fit();
            }
        }
        Ok(self.phase)
    }

    fn fit(&mut self) -> Result<CalibrationPhase, CalibrationError> {
        for (i, point) in self.points.iter().enumerate() {
            if point.samples.len() < self.samples_per_point {
                self.phase = CalibrationPhase::Failed;
                return Err(CalibrationError::InsufficientSamples {
                    point: i,
                    have: point.samples.len(),
                    need: self.samples_per_point,
                });
            }
        }

        match CalibrationModel::fit(&self.points, self.residual_tolerance) {
            Ok(model) => {
                info!(
                    "Calibration complete, residual {:.4} (tolerance {:.4})",
                    model.residual, self.residual_tolerance
                );
                self.model = Some(model);
                self.phase = CalibrationPhase::Complete;
                Ok(self.phase)
            }
            Err(e) => {
                warn!("Calibration fit failed: {}", e);
                self.phase = CalibrationPhase::Failed;
                Err(e)
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let Some(model) = &self.model else {
            return Ok(());
        };
        if let Some(parent) = self.storage_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create calibration dir: {:?}", parent))?;
            }
        }
        let file = File::create(&self.storage_path).context("Failed to create calibration file")?;
        serde_json::to_writer_pretty(file, model).context("Failed to serialize calibration")?;
        info!("Saved calibration to {:?}", self.storage_path);
        Ok(())
    }

    pub fn load(&mut self) -> Result<()> {
        if !self.storage_path.exists() {
            info!(
                "No calibration file found at {:?}, starting uncalibrated",
                self.storage_path
            );
            return Ok(());
        }

        let file = File::open(&self.storage_path).context("Failed to open calibration file")?;
        let reader = BufReader::new(file);
        let model: CalibrationModel =
            serde_json::from_reader(reader).context("Failed to deserialize calibration")?;

        if !model.residual.is_finite() {
            warn!("Stored calibration has a non-finite residual, ignoring it");
            return Ok(());
        }

        self.model = Some(model);
        self.phase = CalibrationPhase::Complete;
        info!("Loaded calibration from {:?}", self.storage_path);
        Ok(())
    }
}
