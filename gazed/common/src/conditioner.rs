use crate::config::ConditionerConfig;
use crate::error::ConditionError;
use crate::euro_filter::EuroFilter;
use api::{LandmarkFrame, PerformanceProfile};
use glam::Vec3;
use std::collections::VecDeque;
use std::time::Duration;

/// Per-stream smoothing and outlier rejection over raw landmark frames.
///
/// Frames below the confidence floor are rejected before they can touch
/// the history; accepted frames are averaged across a bounded sliding
/// window and run through per-coordinate euro filters. One conditioner
/// instance serves one region (eye or hand).
pub struct SignalConditioner {
    floor: f32,
    window_len: usize,
    window: VecDeque<Vec<Vec3>>,
    filters: Vec<[EuroFilter; 3]>,
    min_cutoff: f32,
    beta: f32,
    last_timestamp: Option<Duration>,
}

impl SignalConditioner {
    pub fn new(config: &ConditionerConfig, profile: &PerformanceProfile) -> Self {
        let (min_cutoff, beta) = Self::filter_params(config.smoothness);
        Self {
            floor: config.confidence_floor,
            window_len: profile.filter_window.max(1),
            window: VecDeque::new(),
            filters: Vec::new(),
            min_cutoff,
            beta,
            last_timestamp: None,
        }
    }

    fn filter_params(smoothness: f32) -> (f32, f32) {
        let min_cutoff = if smoothness <= 0.0 {
            10.0
        } else {
            1.0 / (smoothness * 10.0)
        };
        let beta = if smoothness <= 0.0 {
            1.0
        } else {
            0.5 * (1.0 - smoothness)
        };
        (min_cutoff, beta)
    }

    /// Pick up a new tier profile. Shrinking the window drops the oldest
    /// frames immediately.
    pub fn apply_profile(&mut self, profile: &PerformanceProfile) {
        self.window_len = profile.filter_window.max(1);
        while self.window.len() > self.window_len {
            self.window.pop_front();
        }
    }

    /// Current bounded history depth, for diagnostics.
    pub fn window_depth(&self) -> usize {
        self.window.len()
    }

    pub fn condition(&mut self, raw: LandmarkFrame) -> Result<LandmarkFrame, ConditionError> {
        if raw.confidence < self.floor {
            return Err(ConditionError::LowConfidence {
                confidence: raw.confidence,
                floor: self.floor,
            });
        }

        let dt = match self.last_timestamp {
            Some(prev) if raw.timestamp > prev => (raw.timestamp - prev).as_secs_f32(),
            _ => 0.0,
        };
        self.last_timestamp = Some(raw.timestamp);

        // Landmark count changes (detector re-lock) invalidate the window.
        if self
            .window
            .back()
            .is_some_and(|prev| prev.len() != raw.points.len())
        {
            self.window.clear();
            self.filters.clear();
        }

        self.window.push_back(raw.points.clone());
        if self.window.len() > self.window_len {
            self.window.pop_front();
        }

        if self.filters.len() != raw.points.len() {
            self.filters = vec![
                [
                    EuroFilter::new_with_config(self.min_cutoff, self.beta);
                    3
                ];
                raw.points.len()
            ];
        }

        let scale = 1.0 / self.window.len() as f32;
        let mut points = vec![Vec3::ZERO; raw.points.len()];
        for frame in &self.window {
            for (acc, p) in points.iter_mut().zip(frame.iter()) {
                *acc += *p * scale;
            }
        }

        for (point, filter) in points.iter_mut().zip(self.filters.iter_mut()) {
            point.x = filter[0].filter(point.x, dt);
            point.y = filter[1].filter(point.y, dt);
            point.z = filter[2].filter(point.z, dt);
        }

        Ok(LandmarkFrame {
            region: raw.region,
            points,
            timestamp: raw.timestamp,
            confidence: raw.confidence,
        })
    }

    /// Drop all history, e.g. after tracking loss.
    pub fn reset(&mut self) {
        self.window.clear();
        self.filters.clear();
        self.last_timestamp = None;
    }
}
