use common::{
    target_grid, CalibrationConfig, CalibrationError, CalibrationManager, CalibrationModel,
    CalibrationPhase, CalibrationPoint, TARGET_POINTS,
};
use glam::Vec2;
use std::path::PathBuf;

fn test_config() -> CalibrationConfig {
    CalibrationConfig {
        samples_per_point: 3,
        residual_tolerance: 0.05,
    }
}

fn manager() -> CalibrationManager {
    CalibrationManager::new(PathBuf::from("."), &test_config())
}

/// Features generated by an invertible affine view of the screen, so a
/// perfect fit exists.
fn feature_for(target: Vec2) -> Vec2 {
    Vec2::new(target.x * 0.5 + 0.1, target.y * 0.4 + 0.25)
}

fn run_full_session(mgr: &mut CalibrationManager) -> Result<CalibrationPhase, CalibrationError> {
    mgr.begin()?;
    let mut phase = mgr.phase();
    while let Some(target) = mgr.current_target() {
        phase = mgr.push_sample(feature_for(target))?;
    }
    Ok(phase)
}

#[test]
fn test_nine_point_session_completes() {
    let mut mgr = manager();
    let phase = run_full_session(&mut mgr).expect("session should complete");
    assert_eq!(phase, CalibrationPhase::Complete);

    let model = mgr.model().expect("model present after Complete");
    assert!(
        model.residual < 1e-3,
        "Noise-free fit should have near-zero residual, got {}",
        model.residual
    );
}

#[test]
fn test_round_trip_on_training_points() {
    let mut mgr = manager();
    run_full_session(&mut mgr).unwrap();
    let model = mgr.model().unwrap();

    for target in target_grid() {
        let mapped = model.map(feature_for(target));
        assert!(
            mapped.distance(target) < 1e-3,
            "Target {:?} round-tripped to {:?}",
            target,
            mapped
        );
    }
}

#[test]
fn test_begin_while_collecting_is_rejected() {
    let mut mgr = manager();
    mgr.begin().unwrap();
    assert_eq!(mgr.begin(), Err(CalibrationError::AlreadyCalibrating));
}

#[test]
fn test_recalibration_after_complete() {
    let mut mgr = manager();
    run_full_session(&mut mgr).unwrap();
    assert_eq!(mgr.phase(), CalibrationPhase::Complete);

    // Re-entering begin() from Complete starts a fresh session; the old
    // model stays active until a new fit lands.
    mgr.begin().expect("recalibration should be allowed");
    assert_eq!(mgr.phase(), CalibrationPhase::Collecting { point: 0 });
    assert!(mgr.model().is_some());
}

#[test]
fn test_degenerate_features_fail_the_fit() {
    let mut mgr = manager();
    mgr.begin().unwrap();

    // Every target sees the same feature: no mapping can separate the
    // screen points, so the session must land on Failed, not Complete.
    let mut result = Ok(CalibrationPhase::Idle);
    while mgr.current_target().is_some() {
        result = mgr.push_sample(Vec2::new(0.5, 0.5));
    }
    assert!(result.is_err());
    assert_eq!(mgr.phase(), CalibrationPhase::Failed);
    assert!(mgr.model().is_none());
}

#[test]
fn test_cancel_returns_to_idle() {
    let mut mgr = manager();
    mgr.begin().unwrap();
    mgr.push_sample(Vec2::new(0.2, 0.2)).unwrap();

    mgr.cancel();
    assert_eq!(mgr.phase(), CalibrationPhase::Idle);
    assert_eq!(mgr.current_target(), None);
}

#[test]
fn test_progress_advances_and_saturates() {
    let mut mgr = manager();
    mgr.begin().unwrap();
    assert_eq!(mgr.progress(), 0.0);

    mgr.push_sample(Vec2::new(0.1, 0.1)).unwrap();
    let early = mgr.progress();
    assert!(early > 0.0 && early < 0.1);

    run_to_completion_from(&mut mgr);
    assert!((mgr.progress() - 1.0).abs() < 1e-6);
}

fn run_to_completion_from(mgr: &mut CalibrationManager) {
    while let Some(target) = mgr.current_target() {
        let _ = mgr.push_sample(feature_for(target));
    }
}

#[test]
fn test_direct_fit_needs_enough_rows() {
    let points: Vec<CalibrationPoint> = target_grid()
        .into_iter()
        .take(2)
        .map(|t| {
            let mut p = CalibrationPoint::new(t);
            p.samples.push(feature_for(t));
            p
        })
        .collect();

    let result = CalibrationModel::fit(&points, 0.05);
    assert!(matches!(
        result,
        Err(CalibrationError::InsufficientSamples { need, .. }) if need == TARGET_POINTS
    ));
}
