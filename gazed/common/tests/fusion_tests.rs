use common::{
    ActionKind, ActionTrigger, FusionConfig, FusionEngine, GazeState, GestureEvent,
};
use glam::Vec2;
use std::time::Duration;

fn settled_gaze(x: f32, y: f32) -> GazeState {
    GazeState {
        position: Vec2::new(x, y),
        velocity: Vec2::ZERO,
        settled: true,
        dwell: Duration::from_millis(900),
        tracking: true,
    }
}

fn gesture(name: &str, at_ms: u64) -> GestureEvent {
    GestureEvent {
        name: name.to_string(),
        confidence: 0.99,
        timestamp: Duration::from_millis(at_ms),
    }
}

fn engine() -> FusionEngine {
    FusionEngine::new(&FusionConfig::default())
}

#[test]
fn test_gesture_beats_concurrent_dwell() {
    let mut fusion = engine();
    let gaze = settled_gaze(0.4, 0.4);
    let now = Duration::from_millis(1000);

    let event = fusion.fuse(
        &gaze,
        Some(gaze.position),
        Some(&gesture("pinch", 990)),
        Some(ActionKind::Drag),
        now,
    );

    let event = event.expect("exactly one event expected");
    assert_eq!(event.kind, ActionKind::Drag);
    assert_eq!(event.trigger, ActionTrigger::Gesture("pinch".to_string()));

    // The dwell candidate was consumed by this cycle; with nothing new
    // pending, the next cycle stays quiet.
    let next = fusion.fuse(&gaze, None, None, None, Duration::from_millis(1033));
    assert!(next.is_none());
}

#[test]
fn test_dwell_alone_emits_click_at_settled_point() {
    let mut fusion = engine();
    let gaze = settled_gaze(0.7, 0.2);

    let event = fusion
        .fuse(&gaze, Some(gaze.position), None, None, Duration::from_millis(500))
        .expect("dwell completion should click");
    assert_eq!(event.kind, ActionKind::Click);
    assert_eq!(event.trigger, ActionTrigger::Dwell);
    assert!(event.target.distance(Vec2::new(0.7, 0.2)) < 1e-6);
}

#[test]
fn test_neither_input_yields_no_event() {
    let mut fusion = engine();
    let gaze = settled_gaze(0.5, 0.5);
    assert!(fusion
        .fuse(&gaze, None, None, None, Duration::from_millis(100))
        .is_none());
}

#[test]
fn test_held_gesture_fires_exactly_once() {
    let mut fusion = engine();
    let gaze = settled_gaze(0.5, 0.5);

    let mut emitted = 0;
    for i in 0..10u64 {
        let now_ms = 1000 + i * 33;
        if fusion
            .fuse(
                &gaze,
                None,
                Some(&gesture("fist", now_ms)),
                Some(ActionKind::Drag),
                Duration::from_millis(now_ms),
            )
            .is_some()
        {
            emitted += 1;
        }
    }
    assert_eq!(emitted, 1, "A held pose must emit a single event");
}

#[test]
fn test_gesture_rearms_after_clearing() {
    let mut fusion = engine();
    let gaze = settled_gaze(0.5, 0.5);

    let first = fusion.fuse(
        &gaze,
        None,
        Some(&gesture("fist", 1000)),
        Some(ActionKind::Drag),
        Duration::from_millis(1000),
    );
    assert!(first.is_some());

    // One cycle without the pose clears the hold.
    assert!(fusion
        .fuse(&gaze, None, None, None, Duration::from_millis(1033))
        .is_none());

    let again = fusion.fuse(
        &gaze,
        None,
        Some(&gesture("fist", 1066)),
        Some(ActionKind::Drag),
        Duration::from_millis(1066),
    );
    assert!(again.is_some(), "Cleared condition should re-arm the trigger");
}

#[test]
fn test_switching_gesture_rearms_immediately() {
    let mut fusion = engine();
    let gaze = settled_gaze(0.5, 0.5);

    fusion
        .fuse(
            &gaze,
            None,
            Some(&gesture("fist", 1000)),
            Some(ActionKind::Drag),
            Duration::from_millis(1000),
        )
        .unwrap();

    let switched = fusion.fuse(
        &gaze,
        None,
        Some(&gesture("pinch", 1033)),
        Some(ActionKind::Click),
        Duration::from_millis(1033),
    );
    assert_eq!(switched.unwrap().kind, ActionKind::Click);
}

#[test]
fn test_stale_gesture_is_ignored() {
    let mut fusion = engine();
    let gaze = settled_gaze(0.5, 0.5);

    // The gesture is far older than the staleness bound; a concurrent
    // dwell click goes through instead.
    let event = fusion.fuse(
        &gaze,
        Some(gaze.position),
        Some(&gesture("pinch", 100)),
        Some(ActionKind::Drag),
        Duration::from_millis(2000),
    );
    assert_eq!(event.unwrap().trigger, ActionTrigger::Dwell);
}

#[test]
fn test_gesture_works_while_tracking_lost() {
    let mut fusion = engine();
    let gaze = GazeState {
        tracking: false,
        ..settled_gaze(0.3, 0.6)
    };

    let event = fusion.fuse(
        &gaze,
        None,
        Some(&gesture("pinch", 1000)),
        Some(ActionKind::Click),
        Duration::from_millis(1000),
    );
    let event = event.expect("gesture-only control must survive gaze loss");
    assert!(event.target.distance(Vec2::new(0.3, 0.6)) < 1e-6);
}
