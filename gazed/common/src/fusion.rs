use crate::config::FusionConfig;
use api::{ActionEvent, ActionKind, ActionTrigger, GazeState, GestureEvent};
use glam::Vec2;
use log::debug;
use std::time::Duration;

/// Output seam to the external action executor. Delivery is
/// fire-and-forget; no acknowledgment is required for correctness.
pub trait ActionSink: Send + Sync {
    fn initialize(&mut self) -> anyhow::Result<()>;
    fn send(&self, event: &ActionEvent) -> anyhow::Result<()>;
}

/// Combines the gaze point, the dwell candidate, and the frame's gesture
/// classification into at most one ActionEvent per cycle.
///
/// Precedence: a qualifying gesture beats a concurrent dwell completion,
/// and the dwell candidate is consumed either way so the pair can never
/// double-fire. A held gesture emits once and then stays suppressed
/// until a cycle passes with no (or a different) classification.
pub struct FusionEngine {
    max_event_age: Duration,
    held_gesture: Option<String>,
}

impl FusionEngine {
    pub fn new(config: &FusionConfig) -> Self {
        Self {
            max_event_age: Duration::from_secs_f32(config.max_event_age_s.max(0.0)),
            held_gesture: None,
        }
    }

    pub fn fuse(
        &mut self,
        gaze: &GazeState,
        dwell_candidate: Option<Vec2>,
        gesture: Option<&GestureEvent>,
        gesture_action: Option<ActionKind>,
        now: Duration,
    ) -> Option<ActionEvent> {
        let gesture = gesture.filter(|g| {
            let fresh = now.saturating_sub(g.timestamp) <= self.max_event_age;
            if !fresh {
                debug!("Dropping stale gesture '{}' at fusion", g.name);
            }
            fresh
        });

        // Re-arm when the pose clears or changes.
        if let Some(held) = &self.held_gesture {
            if gesture.map(|g| g.name != *held).unwrap_or(true) {
                self.held_gesture = None;
            }
        }

        if let (Some(event), Some(kind)) = (gesture, gesture_action) {
            if self.held_gesture.is_some() {
                return None;
            }
            self.held_gesture = Some(event.name.clone());
            // Gesture control stays available through gaze loss: the
            // last known position is still the best target we have.
            return Some(ActionEvent {
                target: gaze.position,
                trigger: ActionTrigger::Gesture(event.name.clone()),
                kind,
                timestamp: now,
            });
        }

        dwell_candidate.map(|target| ActionEvent {
            target,
            trigger: ActionTrigger::Dwell,
            kind: ActionKind::Click,
            timestamp: now,
        })
    }
}
