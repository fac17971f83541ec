//! End-to-end pipeline tests over synthetic landmark streams.

use common::{
    train_profile, ActionKind, ActionTrigger, CalibrationPhase, ControllerConfig, GestureProfile,
    HardwareTier, LandmarkFrame, LandmarkUpdate, Region,
};
use gazed::pipeline::ControlPipeline;
use glam::{Vec2, Vec3};
use std::path::PathBuf;
use std::time::Duration;

const FRAME_MS: u64 = 33;
const HAND_POINTS: usize = 21;

fn test_config() -> ControllerConfig {
    let mut config = ControllerConfig::default();
    config.governor.tier = HardwareTier::Low;
    config.conditioner.smoothness = 0.0;
    config.calibration.samples_per_point = 3;
    config.calibration.residual_tolerance = 0.05;
    config
}

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gazed_pipe_{}_{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn eye_update(x: f32, y: f32, now: Duration) -> LandmarkUpdate {
    LandmarkUpdate {
        eye: Some(LandmarkFrame::new(
            Region::Eye,
            vec![Vec3::new(x, y, 0.0)],
            now,
            0.95,
        )),
        hand: None,
    }
}

fn open_hand() -> Vec<Vec3> {
    let wrist = Vec3::new(0.5, 0.8, 0.0);
    let mut p = vec![wrist; HAND_POINTS];
    for f in 0..5 {
        let dx = (f as f32 - 2.0) * 0.05;
        for j in 0..4 {
            let reach = (j + 1) as f32 / 4.0;
            p[1 + f * 4 + j] = wrist + Vec3::new(dx, -0.35 * reach, 0.0);
        }
    }
    p
}

fn pinch_hand() -> Vec<Vec3> {
    let mut p = open_hand();
    let meet = p[0] + Vec3::new(-0.05, -0.3, 0.0);
    p[4] = meet;
    p[8] = meet + Vec3::new(0.004, 0.0, 0.0);
    p
}

fn hand_update(points: Vec<Vec3>, now: Duration) -> LandmarkUpdate {
    LandmarkUpdate {
        eye: None,
        hand: Some(LandmarkFrame::new(Region::Hand, points, now, 0.9)),
    }
}

fn pinch_profile(config: &ControllerConfig) -> GestureProfile {
    let samples: Vec<LandmarkFrame> = (0..8)
        .map(|i| {
            LandmarkFrame::new(
                Region::Hand,
                pinch_hand(),
                Duration::from_millis(i * FRAME_MS),
                0.9,
            )
        })
        .collect();
    train_profile("pinch", ActionKind::Drag, &samples, &config.gesture).unwrap()
}

/// Drive a full 9-point session with noise-free synthetic landmarks
/// whose eye feature equals the screen target (identity view).
fn calibrate(pipeline: &mut ControlPipeline, now: &mut Duration) {
    pipeline.start_calibration().unwrap();

    let mut cycles = 0;
    while let Some(target) = pipeline.calibration.current_target() {
        let action = pipeline.run_cycle(eye_update(target.x, target.y, *now), *now);
        assert!(action.is_none(), "No actions while calibrating");
        *now += Duration::from_millis(FRAME_MS);
        cycles += 1;
        assert!(cycles < 100, "Calibration session did not converge");
    }

    assert_eq!(pipeline.calibration.phase(), CalibrationPhase::Complete);
}

#[test]
fn test_calibration_then_gaze_maps_to_target() {
    let dir = temp_dir("calibrate");
    let config = test_config();
    let mut pipeline = ControlPipeline::new(config, Vec::new(), dir.clone());

    let mut now = Duration::from_millis(100);
    calibrate(&mut pipeline, &mut now);

    let residual = pipeline.calibration.model().unwrap().residual;
    assert!(
        residual < 1e-3,
        "Noise-free session should fit with near-zero residual, got {}",
        residual
    );

    // A landmark matching a calibration sample maps back to its target.
    for _ in 0..40 {
        pipeline.run_cycle(eye_update(0.5, 0.5, now), now);
        now += Duration::from_millis(FRAME_MS);
    }
    let gaze = pipeline.gaze_state();
    assert!(gaze.tracking);
    assert!(
        gaze.position.distance(Vec2::new(0.5, 0.5)) < 0.02,
        "Gaze {:?} should sit on the fixated target",
        gaze.position
    );

    // The model was persisted on completion.
    assert!(dir.join("calibration.json").exists());
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_sustained_fixation_produces_one_dwell_click() {
    let dir = temp_dir("dwell");
    let config = test_config();
    let mut pipeline = ControlPipeline::new(config, Vec::new(), dir.clone());

    let mut now = Duration::from_millis(100);
    calibrate(&mut pipeline, &mut now);

    let mut actions = Vec::new();
    for _ in 0..150 {
        if let Some(event) = pipeline.run_cycle(eye_update(0.5, 0.5, now), now) {
            actions.push(event);
        }
        now += Duration::from_millis(FRAME_MS);
    }

    assert_eq!(actions.len(), 1, "One fixation, one click");
    let event = &actions[0];
    assert_eq!(event.kind, ActionKind::Click);
    assert_eq!(event.trigger, ActionTrigger::Dwell);
    assert!(event.target.distance(Vec2::new(0.5, 0.5)) < 0.05);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_gesture_only_control_without_calibration() {
    let dir = temp_dir("gesture");
    let config = test_config();
    let profile = pinch_profile(&config);
    let mut pipeline = ControlPipeline::new(config, vec![profile], dir.clone());

    let mut now = Duration::from_millis(100);
    let mut actions = Vec::new();

    // Hold the pinch for a while: the cooldown permits a single event.
    for _ in 0..10 {
        if let Some(event) = pipeline.run_cycle(hand_update(pinch_hand(), now), now) {
            actions.push(event);
        }
        now += Duration::from_millis(FRAME_MS);
    }
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::Drag);
    assert_eq!(
        actions[0].trigger,
        ActionTrigger::Gesture("pinch".to_string())
    );

    // Release for one cycle, then pinch again: re-armed.
    pipeline.run_cycle(LandmarkUpdate::default(), now);
    now += Duration::from_millis(FRAME_MS);

    let again = pipeline.run_cycle(hand_update(pinch_hand(), now), now);
    assert!(again.is_some(), "Cleared pose should re-arm the gesture");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_unmatched_pose_emits_nothing() {
    let dir = temp_dir("nomatch");
    let config = test_config();
    let profile = pinch_profile(&config);
    let mut pipeline = ControlPipeline::new(config, vec![profile], dir.clone());

    let mut now = Duration::from_millis(100);
    for _ in 0..10 {
        let action = pipeline.run_cycle(hand_update(open_hand(), now), now);
        assert!(action.is_none(), "An untrained pose must not act");
        now += Duration::from_millis(FRAME_MS);
    }

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_stale_frames_are_dropped() {
    let dir = temp_dir("stale");
    let config = test_config();
    let profile = pinch_profile(&config);
    let mut pipeline = ControlPipeline::new(config, vec![profile], dir.clone());

    // The hand frame is a second old by the time the cycle runs; its
    // stream contributes nothing, so no action fires.
    let captured = Duration::from_millis(100);
    let now = Duration::from_millis(1100);
    let action = pipeline.run_cycle(hand_update(pinch_hand(), captured), now);
    assert!(action.is_none());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_missing_frames_degrade_to_tracking_loss_not_failure() {
    let dir = temp_dir("loss");
    let config = test_config();
    let loss_frames = config.gaze.loss_frames;
    let mut pipeline = ControlPipeline::new(config, Vec::new(), dir.clone());

    let mut now = Duration::from_millis(100);
    calibrate(&mut pipeline, &mut now);

    for _ in 0..20 {
        pipeline.run_cycle(eye_update(0.5, 0.5, now), now);
        now += Duration::from_millis(FRAME_MS);
    }
    assert!(pipeline.gaze_state().tracking);

    for _ in 0..loss_frames {
        pipeline.run_cycle(LandmarkUpdate::default(), now);
        now += Duration::from_millis(FRAME_MS);
    }
    assert!(
        !pipeline.gaze_state().tracking,
        "Sustained missing frames should reset to unsettled, not crash"
    );

    let _ = std::fs::remove_dir_all(dir);
}
