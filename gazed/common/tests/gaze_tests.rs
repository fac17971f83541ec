use common::{
    target_grid, CalibrationModel, CalibrationPoint, GazeConfig, GazeEstimator, LandmarkFrame,
    Region,
};
use glam::{Vec2, Vec3};
use std::time::Duration;

const FRAME_MS: u64 = 33;

/// Identity calibration: the eye feature already is the screen point.
fn identity_model() -> CalibrationModel {
    let points: Vec<CalibrationPoint> = target_grid()
        .into_iter()
        .map(|t| {
            let mut p = CalibrationPoint::new(t);
            p.samples.push(t);
            p
        })
        .collect();
    CalibrationModel::fit(&points, 0.01).expect("identity fit")
}

fn eye_at(x: f32, y: f32, ms: u64) -> LandmarkFrame {
    LandmarkFrame::new(
        Region::Eye,
        vec![Vec3::new(x, y, 0.0)],
        Duration::from_millis(ms),
        0.95,
    )
}

fn config() -> GazeConfig {
    GazeConfig::default()
}

#[test]
fn test_stationary_input_converges() {
    let model = identity_model();
    let mut est = GazeEstimator::new(config());

    for i in 0..50u64 {
        est.estimate(&eye_at(0.3, 0.4, i * FRAME_MS), &model);
    }

    let state = est.state();
    assert!(state.tracking);
    assert!(state.settled, "Stationary gaze should settle");
    assert!(state.velocity.length() < 0.01, "Velocity should decay to ~0");
    assert!(state.position.distance(Vec2::new(0.3, 0.4)) < 0.01);
}

#[test]
fn test_step_then_hold_converges_to_new_point() {
    let model = identity_model();
    let mut est = GazeEstimator::new(config());

    for i in 0..20u64 {
        est.estimate(&eye_at(0.2, 0.2, i * FRAME_MS), &model);
    }
    for i in 20..80u64 {
        est.estimate(&eye_at(0.8, 0.7, i * FRAME_MS), &model);
    }

    let state = est.state();
    assert!(state.position.distance(Vec2::new(0.8, 0.7)) < 0.01);
    assert!(state.velocity.length() < 0.05);
}

#[test]
fn test_frame_gap_resets_velocity_without_spike() {
    let model = identity_model();
    let mut est = GazeEstimator::new(config());

    // Build up some motion first.
    for i in 0..20u64 {
        let x = 0.2 + i as f32 * 0.01;
        est.estimate(&eye_at(x, 0.5, i * FRAME_MS), &model);
    }
    assert!(est.state().velocity.length() > 0.0);

    // A gap far beyond the ceiling, with the eye somewhere new.
    let gap_ms = 20 * FRAME_MS + 2_000;
    est.estimate(&eye_at(0.9, 0.9, gap_ms), &model);

    let state = est.state();
    assert_eq!(
        state.velocity,
        Vec2::ZERO,
        "A frame gap must never turn into a velocity spike"
    );
    assert!(!state.settled);
    assert_eq!(state.dwell, Duration::ZERO);
    assert!(state.position.distance(Vec2::new(0.9, 0.9)) < 1e-4);
}

#[test]
fn test_tracking_loss_after_missing_streak() {
    let model = identity_model();
    let mut est = GazeEstimator::new(config());

    for i in 0..10u64 {
        est.estimate(&eye_at(0.5, 0.5, i * FRAME_MS), &model);
    }
    assert!(est.state().tracking);

    for _ in 0..config().loss_frames {
        est.note_missing();
    }
    assert!(est.tracking_lost());
    assert_eq!(est.state().velocity, Vec2::ZERO);
    assert!(!est.state().settled);
    assert_eq!(est.state().dwell, Duration::ZERO);
}

#[test]
fn test_dwell_fires_once_and_rearms_after_leaving() {
    let model = identity_model();
    let cfg = config();
    let hold_frames = (cfg.dwell_hold_s * 1000.0) as u64 / FRAME_MS + 5;
    let mut est = GazeEstimator::new(cfg);

    let mut t = 0u64;
    for _ in 0..hold_frames {
        est.estimate(&eye_at(0.4, 0.4, t), &model);
        t += FRAME_MS;
    }
    let first = est.take_dwell();
    assert!(first.is_some(), "Dwell should complete after the hold time");
    assert!(first.unwrap().distance(Vec2::new(0.4, 0.4)) < 0.01);

    // Keep staring: latched, no second candidate.
    for _ in 0..hold_frames {
        est.estimate(&eye_at(0.4, 0.4, t), &model);
        t += FRAME_MS;
    }
    assert!(est.take_dwell().is_none(), "Dwell must not refire while held");

    // Look away, then come back and hold again.
    for _ in 0..20 {
        est.estimate(&eye_at(0.9, 0.9, t), &model);
        t += FRAME_MS;
    }
    for _ in 0..3 * hold_frames {
        est.estimate(&eye_at(0.4, 0.4, t), &model);
        t += FRAME_MS;
    }
    assert!(
        est.take_dwell().is_some(),
        "Dwell should re-arm after leaving the radius"
    );
}

#[test]
fn test_empty_frame_counts_as_missing() {
    let model = identity_model();
    let mut est = GazeEstimator::new(config());

    let empty = LandmarkFrame::new(Region::Eye, Vec::new(), Duration::from_millis(0), 0.9);
    for _ in 0..config().loss_frames {
        est.estimate(&empty, &model);
    }
    assert!(est.tracking_lost());
}
