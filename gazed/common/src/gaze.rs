use crate::calibration::{eye_feature, CalibrationModel};
use crate::config::GazeConfig;
use api::{GazeState, LandmarkFrame};
use glam::Vec2;
use log::debug;
use std::time::Duration;

const MIN_DT: f32 = 1e-3;

/// Turns conditioned eye frames into a stabilized on-screen gaze point.
///
/// The calibration transform gives a raw screen estimate; an alpha-beta
/// filter tracking position and velocity fuses it with the motion model.
/// The update is deterministic given (measurement, prior state, dt).
pub struct GazeEstimator {
    state: GazeState,
    config: GazeConfig,
    last_timestamp: Option<Duration>,
    missing_streak: u32,
    dwell_anchor: Vec2,
    dwell_latched: bool,
    dwell_pending: Option<Vec2>,
}

impl GazeEstimator {
    pub fn new(config: GazeConfig) -> Self {
        Self {
            state: GazeState::default(),
            config,
            last_timestamp: None,
            missing_streak: 0,
            dwell_anchor: Vec2::new(0.5, 0.5),
            dwell_latched: false,
            dwell_pending: None,
        }
    }

    pub fn state(&self) -> &GazeState {
        &self.state
    }

    /// Update from one conditioned frame. Frame gaps beyond the ceiling
    /// are treated as tracking loss instead of advancing the filter
    /// blindly across the gap.
    pub fn estimate(&mut self, conditioned: &LandmarkFrame, model: &CalibrationModel) -> &GazeState {
        let Some(feature) = eye_feature(conditioned) else {
            self.note_missing();
            return &self.state;
        };
        let raw = model.map(feature);

        let dt = match self.last_timestamp {
            Some(prev) if conditioned.timestamp > prev => {
                (conditioned.timestamp - prev).as_secs_f32()
            }
            Some(_) => MIN_DT,
            None => {
                // First frame seeds the filter directly.
                self.last_timestamp = Some(conditioned.timestamp);
                self.missing_streak = 0;
                self.reseed(raw);
                return &self.state;
            }
        };
        self.last_timestamp = Some(conditioned.timestamp);
        self.missing_streak = 0;

        if dt > self.config.gap_ceiling_s {
            debug!("Frame gap {:.3}s beyond ceiling, reseeding gaze filter", dt);
            self.reseed(raw);
            return &self.state;
        }
        let dt = dt.max(MIN_DT);

        let predicted = self.state.position + self.state.velocity * dt;
        let residual = raw - predicted;
        self.state.position =
            (predicted + residual * self.config.alpha).clamp(Vec2::ZERO, Vec2::ONE);
        self.state.velocity += residual * (self.config.beta / dt);
        self.state.tracking = true;
        self.state.settled = self.state.velocity.length() < self.config.settle_speed;

        self.advance_dwell(dt);
        &self.state
    }

    /// Call when the cycle produced no usable eye frame. After the
    /// configured streak the state resets: velocity zero, unsettled,
    /// dwell suppressed.
    pub fn note_missing(&mut self) {
        self.missing_streak = self.missing_streak.saturating_add(1);
        if self.missing_streak >= self.config.loss_frames && self.state.tracking {
            debug!(
                "Tracking lost after {} missing frames, resetting gaze state",
                self.missing_streak
            );
            self.reset();
        }
    }

    pub fn tracking_lost(&self) -> bool {
        !self.state.tracking
    }

    /// One-shot dwell click candidate. Consuming it does not re-arm the
    /// dwell; the gaze has to leave the dwell radius first.
    pub fn take_dwell(&mut self) -> Option<Vec2> {
        self.dwell_pending.take()
    }

    pub fn reset(&mut self) {
        let position = self.state.position;
        self.state = GazeState {
            position,
            ..GazeState::default()
        };
        self.dwell_latched = false;
        self.dwell_pending = None;
        self.last_timestamp = None;
    }

    fn reseed(&mut self, raw: Vec2) {
        self.state.position = raw.clamp(Vec2::ZERO, Vec2::ONE);
        self.state.velocity = Vec2::ZERO;
        self.state.settled = false;
        self.state.tracking = true;
        self.state.dwell = Duration::ZERO;
        self.dwell_anchor = self.state.position;
        self.dwell_latched = false;
    }

    fn advance_dwell(&mut self, dt: f32) {
        let within = self.state.position.distance(self.dwell_anchor) <= self.config.dwell_radius;
        if self.state.settled && within {
            self.state.dwell += Duration::from_secs_f32(dt);
            if !self.dwell_latched && self.state.dwell.as_secs_f32() >= self.config.dwell_hold_s {
                self.dwell_latched = true;
                self.dwell_pending = Some(self.state.position);
            }
        } else {
            self.dwell_anchor = self.state.position;
            self.state.dwell = Duration::ZERO;
            self.dwell_latched = false;
            self.dwell_pending = None;
        }
    }
}
