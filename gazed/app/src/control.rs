use axum::{extract::State, routing::get, Json, Router};
use common::GazeState;
use serde_json::{json, Value};
use std::sync::{Arc, RwLock};

/// Snapshot published by the consumer thread for the presentation layer
/// to poll.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
pub struct ControlStatus {
    pub gaze: GazeState,
    pub tier: String,
    pub fps: f32,
    pub calibrating: bool,
    pub calibration_phase: String,
    pub calibration_progress: f32,
    pub calibration_target: Option<[f32; 2]>,
    pub calibration_residual: Option<f32>,
}

/// Commands the HTTP surface relays to the consumer thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    StartCalibration,
    CancelCalibration,
}

#[derive(Clone)]
struct ControlState {
    status: Arc<RwLock<ControlStatus>>,
    command: Arc<RwLock<Option<ControlCommand>>>,
}

pub fn get_router(
    status: Arc<RwLock<ControlStatus>>,
    command: Arc<RwLock<Option<ControlCommand>>>,
) -> Router {
    let state = ControlState { status, command };

    Router::new()
        .route("/status", get(status_handler))
        .route("/calibration", get(calibration_handler))
        .route(
            "/calibration/start",
            axum::routing::post(start_calibration_handler),
        )
        .route(
            "/calibration/cancel",
            axum::routing::post(cancel_calibration_handler),
        )
        .with_state(state)
}

async fn status_handler(State(state): State<ControlState>) -> Json<Value> {
    let status = state.status.read().unwrap().clone();
    Json(json!({
        "status": "ok",
        "state": status
    }))
}

async fn calibration_handler(State(state): State<ControlState>) -> Json<Value> {
    let status = state.status.read().unwrap().clone();
    Json(json!({
        "status": "ok",
        "calibrating": status.calibrating,
        "phase": status.calibration_phase,
        "progress": status.calibration_progress,
        "target": status.calibration_target,
        "residual": status.calibration_residual
    }))
}

async fn start_calibration_handler(State(state): State<ControlState>) -> Json<Value> {
    let status = state.status.read().unwrap().clone();
    if status.calibrating {
        return Json(json!({
            "status": "already_calibrating",
            "message": "A calibration session is already in progress",
            "progress": status.calibration_progress
        }));
    }

    // Signal the consumer thread to start calibration
    if let Ok(mut cmd) = state.command.write() {
        *cmd = Some(ControlCommand::StartCalibration);
    }

    Json(json!({ "status": "starting" }))
}

async fn cancel_calibration_handler(State(state): State<ControlState>) -> Json<Value> {
    if let Ok(mut cmd) = state.command.write() {
        *cmd = Some(ControlCommand::CancelCalibration);
    }
    Json(json!({ "status": "cancelling" }))
}
