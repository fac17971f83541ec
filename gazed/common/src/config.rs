use api::HardwareTier;
use serde::{Deserialize, Serialize};

/// Which sink carries ActionEvents to the executor/UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum SinkMode {
    #[default]
    #[serde(alias = "OSC", alias = "osc")]
    Osc,
    #[serde(alias = "Json", alias = "json", alias = "JsonUDP")]
    JsonUdp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// File name of the landmark module to poll, under plugins/native.
    pub active: String,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            active: default_active_module(),
        }
    }
}

fn default_active_module() -> String {
    if cfg!(windows) {
        "synthetic_module.dll".to_string()
    } else {
        "libsynthetic_module.so".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub mode: SinkMode,
    pub send_address: String,
    pub send_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: SinkMode::default(),
            send_address: "127.0.0.1".to_string(),
            send_port: 9100,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionerConfig {
    /// Frames with detector confidence below this are rejected.
    pub confidence_floor: f32,
    /// 0 = no smoothing, 1 = maximum; maps onto the euro filter params.
    pub smoothness: f32,
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.5,
            smoothness: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Samples collected per target before advancing.
    pub samples_per_point: usize,
    /// RMS residual (normalized screen units) above which the fit fails.
    pub residual_tolerance: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            samples_per_point: 12,
            residual_tolerance: 0.08,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Position correction gain of the alpha-beta filter.
    pub alpha: f32,
    /// Velocity correction gain.
    pub beta: f32,
    /// Frame gaps above this many seconds count as tracking loss.
    pub gap_ceiling_s: f32,
    /// Consecutive missing/rejected frames before TrackingLost.
    pub loss_frames: u32,
    /// Speed (screen units/s) under which gaze counts as settled.
    pub settle_speed: f32,
    /// Radius around the dwell anchor that keeps the timer running.
    pub dwell_radius: f32,
    /// Dwell hold time in seconds to trigger a click candidate.
    pub dwell_hold_s: f32,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            beta: 0.2,
            gap_ceiling_s: 0.25,
            loss_frames: 10,
            settle_speed: 0.15,
            dwell_radius: 0.04,
            dwell_hold_s: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Two profiles scoring within this of each other is an ambiguous
    /// classification and yields none.
    pub tie_epsilon: f32,
    /// Minimum training samples per gesture.
    pub min_train_samples: usize,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            tie_epsilon: 0.02,
            min_train_samples: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Gesture events older than this many seconds at fusion time are
    /// dropped as stale.
    pub max_event_age_s: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { max_event_age_s: 0.2 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Initial tier; the governor adapts from there.
    pub tier: HardwareTier,
    /// Per-cycle latency budget in milliseconds.
    pub cycle_budget_ms: f32,
    /// Consecutive over-budget cycles before a downgrade.
    pub breach_window: usize,
    /// Fraction of the budget under which cycles count toward an upgrade.
    pub upgrade_margin: f32,
    /// Consecutive comfortable cycles before an upgrade.
    pub upgrade_window: usize,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            tier: HardwareTier::Mid,
            cycle_budget_ms: 33.0,
            breach_window: 30,
            upgrade_margin: 0.5,
            upgrade_window: 120,
        }
    }
}

/// Top-level daemon configuration, persisted as config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub module: ModuleConfig,
    pub output: OutputConfig,
    pub conditioner: ConditionerConfig,
    pub calibration: CalibrationConfig,
    pub gaze: GazeConfig,
    pub gesture: GestureConfig,
    pub fusion: FusionConfig,
    pub governor: GovernorConfig,
    pub max_fps: Option<f32>,
    pub control_port: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            module: ModuleConfig::default(),
            output: OutputConfig::default(),
            conditioner: ConditionerConfig::default(),
            calibration: CalibrationConfig::default(),
            gaze: GazeConfig::default(),
            gesture: GestureConfig::default(),
            fusion: FusionConfig::default(),
            governor: GovernorConfig::default(),
            max_fps: Some(60.0),
            control_port: 9180,
        }
    }
}
