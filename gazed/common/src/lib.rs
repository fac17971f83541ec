pub use api::{
    ActionEvent, ActionKind, ActionTrigger, GazeState, GestureEvent, HardwareTier, LandmarkFrame,
    LandmarkModule, LandmarkUpdate, PerformanceProfile, Region,
};

mod calibration;
pub mod calibration_manager;
mod conditioner;
mod config;
mod error;
mod euro_filter;
mod fusion;
mod gaze;
mod gesture;
pub mod gesture_store;
mod governor;

pub use calibration::{eye_feature, target_grid, CalibrationModel, CalibrationPoint, TARGET_POINTS};
pub use calibration_manager::{CalibrationManager, CalibrationPhase};
pub use conditioner::SignalConditioner;
pub use config::{
    CalibrationConfig, ConditionerConfig, ControllerConfig, FusionConfig, GazeConfig,
    GestureConfig, GovernorConfig, ModuleConfig, OutputConfig, SinkMode,
};
pub use error::{CalibrationError, ConditionError, GestureError};
pub use euro_filter::EuroFilter;
pub use fusion::{ActionSink, FusionEngine};
pub use gaze::GazeEstimator;
pub use gesture::{descriptor, similarity, train_profile, GestureClassifier, GestureProfile};
pub use governor::PerformanceGovernor;
