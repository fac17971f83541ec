use anyhow::Result;
use common::{
    ActionEvent, CalibrationManager, CalibrationPhase, ControllerConfig, FusionEngine,
    GazeEstimator, GazeState, GestureClassifier, GestureEvent, GestureProfile, LandmarkFrame,
    LandmarkUpdate, PerformanceGovernor, PerformanceProfile, SignalConditioner,
};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// One frame cycle through the whole engine: conditioning, calibration
/// routing, gaze estimation, gesture classification, fusion, and the
/// governor's latency feedback.
///
/// The pipeline is single-threaded by construction; the daemon runs it
/// on the consumer side of the frame channel.
pub struct ControlPipeline {
    config: ControllerConfig,
    eye_conditioner: SignalConditioner,
    hand_conditioner: SignalConditioner,
    pub calibration: CalibrationManager,
    estimator: GazeEstimator,
    classifier: GestureClassifier,
    fusion: FusionEngine,
    governor: PerformanceGovernor,
    stale_budget: Duration,
    was_collecting: bool,
    active_target: Option<usize>,
}

impl ControlPipeline {
    pub fn new(
        config: ControllerConfig,
        profiles: Vec<GestureProfile>,
        storage_dir: PathBuf,
    ) -> Self {
        let governor = PerformanceGovernor::new(&config.governor);
        let profile = governor.profile();
        Self {
            eye_conditioner: SignalConditioner::new(&config.conditioner, &profile),
            hand_conditioner: SignalConditioner::new(&config.conditioner, &profile),
            calibration: CalibrationManager::new(storage_dir, &config.calibration),
            estimator: GazeEstimator::new(config.gaze),
            classifier: GestureClassifier::new(profiles, &config.gesture),
            fusion: FusionEngine::new(&config.fusion),
            governor,
            stale_budget: Duration::from_secs_f32(config.fusion.max_event_age_s.max(0.0)),
            was_collecting: false,
            active_target: None,
            config,
        }
    }

    pub fn gaze_state(&self) -> &GazeState {
        self.estimator.state()
    }

    pub fn profile(&self) -> PerformanceProfile {
        self.governor.profile()
    }

    pub fn achieved_fps(&self) -> f32 {
        self.governor.achieved_fps()
    }

    pub fn start_calibration(&mut self) -> Result<()> {
        self.calibration.begin()?;
        Ok(())
    }

    pub fn cancel_calibration(&mut self) {
        self.calibration.cancel();
    }

    /// Run one fusion cycle over the latest landmark update. `now` is
    /// the pipeline clock (monotonic, same base as frame timestamps).
    pub fn run_cycle(&mut self, update: LandmarkUpdate, now: Duration) -> Option<ActionEvent> {
        let started = Instant::now();

        // Each calibration target is a deliberate step discontinuity;
        // the smoothing window must not bleed the old fixation into the
        // new target's samples.
        match self.calibration.phase() {
            CalibrationPhase::Collecting { point } => {
                if self.active_target != Some(point) {
                    self.eye_conditioner.reset();
                    self.active_target = Some(point);
                }
            }
            _ => self.active_target = None,
        }

        let eye = self.admit(update.eye, now);
        let hand = self.admit(update.hand, now);

        let eye = self.condition_eye(eye);
        let hand = self.condition_hand(hand);

        let action = if self.collecting() {
            self.feed_calibration(eye.as_ref());
            // No actions while the user is following the target grid.
            None
        } else {
            let gesture = hand.as_ref().and_then(|h| self.classifier.classify(h));
            self.update_gaze(eye.as_ref());
            self.fuse(gesture, now)
        };

        self.note_completion();
        if let Some(profile) = self.governor.record(started.elapsed()) {
            self.eye_conditioner.apply_profile(&profile);
            self.hand_conditioner.apply_profile(&profile);
        }
        action
    }

    fn collecting(&self) -> bool {
        matches!(self.calibration.phase(), CalibrationPhase::Collecting { .. })
    }

    /// Drop frames that exceeded their time budget before reaching us;
    /// their stream contributes nothing this cycle.
    fn admit(&self, frame: Option<LandmarkFrame>, now: Duration) -> Option<LandmarkFrame> {
        let frame = frame?;
        if now.saturating_sub(frame.timestamp) > self.stale_budget {
            debug!(
                "Dropping stale {:?} frame ({:?} old)",
                frame.region,
                now.saturating_sub(frame.timestamp)
            );
            return None;
        }
        Some(frame)
    }

    fn condition_eye(&mut self, frame: Option<LandmarkFrame>) -> Option<LandmarkFrame> {
        match frame.map(|f| self.eye_conditioner.condition(f)) {
            Some(Ok(frame)) => Some(frame),
            Some(Err(e)) => {
                debug!("Eye frame rejected: {}", e);
                None
            }
            None => None,
        }
    }

    fn condition_hand(&mut self, frame: Option<LandmarkFrame>) -> Option<LandmarkFrame> {
        match frame.map(|f| self.hand_conditioner.condition(f)) {
            Some(Ok(frame)) => Some(frame),
            Some(Err(e)) => {
                debug!("Hand frame rejected: {}", e);
                None
            }
            None => None,
        }
    }

    fn feed_calibration(&mut self, eye: Option<&LandmarkFrame>) {
        let Some(feature) = eye.and_then(common::eye_feature) else {
            return;
        };
        if let Err(e) = self.calibration.push_sample(feature) {
            warn!("Calibration failed: {}", e);
        }
    }

    fn update_gaze(&mut self, eye: Option<&LandmarkFrame>) {
        match (eye, self.calibration.model()) {
            (Some(frame), Some(model)) => {
                self.estimator.estimate(frame, model);
            }
            (None, _) => self.estimator.note_missing(),
            // Uncalibrated: gaze idles, gesture-only control remains.
            (Some(_), None) => {}
        }
    }

    fn fuse(&mut self, gesture: Option<GestureEvent>, now: Duration) -> Option<ActionEvent> {
        let dwell = self.estimator.take_dwell();
        let action_kind = gesture
            .as_ref()
            .and_then(|g| self.classifier.action_for(&g.name));
        self.fusion
            .fuse(self.estimator.state(), dwell, gesture.as_ref(), action_kind, now)
    }

    /// Save the model once when a session lands on Complete.
    fn note_completion(&mut self) {
        let collecting = self.collecting();
        if self.was_collecting && !collecting {
            match self.calibration.phase() {
                CalibrationPhase::Complete => {
                    info!("Calibration session finished, persisting model");
                    if let Err(e) = self.calibration.save() {
                        warn!("Failed to save calibration: {}", e);
                    }
                }
                CalibrationPhase::Failed => warn!("Calibration session failed"),
                _ => {}
            }
        }
        self.was_collecting = collecting;
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}
