use anyhow::Result;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which landmark region a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Eye,
    Hand,
}

/// One detector output for one region: an ordered set of normalized
/// image-space points plus the capture timestamp and the detector's
/// scalar confidence for the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub region: Region,
    pub points: Vec<Vec3>,
    pub timestamp: Duration,
    pub confidence: f32,
}

impl LandmarkFrame {
    pub fn new(region: Region, points: Vec<Vec3>, timestamp: Duration, confidence: f32) -> Self {
        Self {
            region,
            points,
            timestamp,
            confidence,
        }
    }
}

/// What a landmark module fills per poll. `None` means no detection for
/// that region this frame, which is an ordinary outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkUpdate {
    pub eye: Option<LandmarkFrame>,
    pub hand: Option<LandmarkFrame>,
}

impl LandmarkUpdate {
    pub fn clear(&mut self) {
        self.eye = None;
        self.hand = None;
    }
}

/// Discrete hardware capability class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum HardwareTier {
    #[serde(alias = "low")]
    Low,
    #[default]
    #[serde(alias = "mid", alias = "medium")]
    Mid,
    #[serde(alias = "high")]
    High,
}

impl HardwareTier {
    pub fn lower(self) -> Option<Self> {
        match self {
            Self::Low => None,
            Self::Mid => Some(Self::Low),
            Self::High => Some(Self::Mid),
        }
    }

    pub fn higher(self) -> Option<Self> {
        match self {
            Self::Low => Some(Self::Mid),
            Self::Mid => Some(Self::High),
            Self::High => None,
        }
    }
}

/// Processing parameters derived from the active tier. Published as a
/// complete value by the governor; stages read it at cycle boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceProfile {
    pub tier: HardwareTier,
    pub detection_width: u32,
    pub detection_height: u32,
    pub filter_window: usize,
    pub detection_decimation: u32,
}

impl PerformanceProfile {
    pub fn for_tier(tier: HardwareTier) -> Self {
        match tier {
            HardwareTier::Low => Self {
                tier,
                detection_width: 640,
                detection_height: 360,
                filter_window: 3,
                detection_decimation: 2,
            },
            HardwareTier::Mid => Self {
                tier,
                detection_width: 960,
                detection_height: 540,
                filter_window: 5,
                detection_decimation: 1,
            },
            HardwareTier::High => Self {
                tier,
                detection_width: 1280,
                detection_height: 720,
                filter_window: 8,
                detection_decimation: 1,
            },
        }
    }
}

impl Default for PerformanceProfile {
    fn default() -> Self {
        Self::for_tier(HardwareTier::default())
    }
}

/// Filtered gaze output for one frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeState {
    /// Normalized screen position (0..1 on both axes).
    pub position: Vec2,
    /// Screen units per second.
    pub velocity: Vec2,
    /// Velocity below the settle threshold.
    pub settled: bool,
    /// Time spent settled inside the dwell radius.
    pub dwell: Duration,
    /// False after tracking loss until landmarks return.
    pub tracking: bool,
}

impl Default for GazeState {
    fn default() -> Self {
        Self {
            position: Vec2::new(0.5, 0.5),
            velocity: Vec2::ZERO,
            settled: false,
            dwell: Duration::ZERO,
            tracking: false,
        }
    }
}

/// A classified hand gesture for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub name: String,
    pub confidence: f32,
    pub timestamp: Duration,
}

/// Desktop action the external executor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Click,
    RightClick,
    DoubleClick,
    Drag,
    Scroll,
}

/// What fired the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionTrigger {
    Dwell,
    Gesture(String),
}

/// The resolved output of one fusion cycle. At most one per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub target: Vec2,
    pub trigger: ActionTrigger,
    pub kind: ActionKind,
    pub timestamp: Duration,
}

/// log level for module logging
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

/// logger callback for modules
pub type LogCallback = extern "C" fn(level: LogLevel, target: *const i8, message: *const i8);

/// Logger interface handed to landmark modules; routes into the host's
/// `log` output through the C callback.
pub struct ModuleLogger {
    callback: LogCallback,
    module_name: String,
}

impl ModuleLogger {
    pub fn new(callback: LogCallback, module_name: String) -> Self {
        Self {
            callback,
            module_name,
        }
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message);
    }

    fn log(&self, level: LogLevel, message: &str) {
        let target = std::ffi::CString::new(self.module_name.as_str()).unwrap();
        let msg = std::ffi::CString::new(message).unwrap();
        (self.callback)(level, target.as_ptr(), msg.as_ptr());
    }
}

/// Contract for a loadable landmark source. A module owns its camera and
/// detector; the host only sees normalized landmark frames. `update` must
/// not block past one frame interval; absent detection leaves the update
/// fields as `None`. Frames are stamped against `now`, the host's
/// monotonic clock, so every stage shares one timebase.
pub trait LandmarkModule {
    fn initialize(&mut self, logger: ModuleLogger) -> Result<()>;
    fn update(&mut self, frames: &mut LandmarkUpdate, now: Duration) -> Result<()>;
    /// Hint for the module's capture/detection cost. Modules may ignore it.
    fn apply_profile(&mut self, _profile: &PerformanceProfile) {}
    fn unload(&mut self);
}
