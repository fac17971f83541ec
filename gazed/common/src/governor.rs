use crate::config::GovernorConfig;
use api::{HardwareTier, PerformanceProfile};
use log::info;
use std::collections::VecDeque;
use std::time::Duration;

/// Watches achieved per-cycle latency and walks the tier ladder one
/// step at a time.
///
/// Moves are hysteretic: a breach must be sustained over the whole
/// window before a downgrade, and headroom over a longer window before
/// an upgrade, so a single slow frame never flips the tier. Streaks
/// reset on every change, which bounds moves to one per window.
pub struct PerformanceGovernor {
    profile: PerformanceProfile,
    budget: Duration,
    breach_window: usize,
    upgrade_window: usize,
    upgrade_margin: f32,
    breach_streak: usize,
    headroom_streak: usize,
    recent: VecDeque<Duration>,
}

impl PerformanceGovernor {
    pub fn new(config: &GovernorConfig) -> Self {
        Self {
            profile: PerformanceProfile::for_tier(config.tier),
            budget: Duration::from_secs_f32(config.cycle_budget_ms.max(1.0) / 1000.0),
            breach_window: config.breach_window.max(1),
            upgrade_window: config.upgrade_window.max(1),
            upgrade_margin: config.upgrade_margin.clamp(0.0, 1.0),
            breach_streak: 0,
            headroom_streak: 0,
            recent: VecDeque::with_capacity(64),
        }
    }

    pub fn profile(&self) -> PerformanceProfile {
        self.profile
    }

    /// Average cycle latency over the rolling window, for diagnostics.
    pub fn mean_latency(&self) -> Duration {
        if self.recent.is_empty() {
            return Duration::ZERO;
        }
        self.recent.iter().sum::<Duration>() / self.recent.len() as u32
    }

    pub fn achieved_fps(&self) -> f32 {
        let mean = self.mean_latency().as_secs_f32();
        if mean > 0.0 {
            1.0 / mean
        } else {
            0.0
        }
    }

    /// Record one cycle's latency. Returns the new profile when the
    /// tier changed, `None` otherwise.
    pub fn record(&mut self, cycle: Duration) -> Option<PerformanceProfile> {
        self.recent.push_back(cycle);
        if self.recent.len() > self.breach_window.max(self.upgrade_window) {
            self.recent.pop_front();
        }

        if cycle > self.budget {
            self.breach_streak += 1;
            self.headroom_streak = 0;
        } else if cycle.as_secs_f32() < self.budget.as_secs_f32() * self.upgrade_margin {
            self.headroom_streak += 1;
            self.breach_streak = 0;
        } else {
            self.breach_streak = 0;
            self.headroom_streak = 0;
        }

        if self.breach_streak >= self.breach_window {
            if let Some(tier) = self.profile.tier.lower() {
                return Some(self.switch(tier));
            }
            self.breach_streak = 0;
        } else if self.headroom_streak >= self.upgrade_window {
            if let Some(tier) = self.profile.tier.higher() {
                return Some(self.switch(tier));
            }
            self.headroom_streak = 0;
        }
        None
    }

    fn switch(&mut self, tier: HardwareTier) -> PerformanceProfile {
        info!(
            "Performance tier {:?} -> {:?} (mean cycle {:?})",
            self.profile.tier,
            tier,
            self.mean_latency()
        );
        self.profile = PerformanceProfile::for_tier(tier);
        self.breach_streak = 0;
        self.headroom_streak = 0;
        self.recent.clear();
        self.profile
    }
}
