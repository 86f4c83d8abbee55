use std::time::{Duration, Instant};
use crate::drivers::config::ScopeConfig;
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleState {
    /// Next arrival recomputes.
    Idle,
    /// Still inside the interval since the last recompute.
    Suppressed,
}
/// Latest-wins rate limiter for recomputation. Suppressed arrivals are dropped, not queued.
#[derive(Clone, Debug)]
pub struct UpdateThrottle {
    interval: Duration,
    enabled: bool,
    last_emit: Option<Instant>,
}
impl UpdateThrottle {
    pub fn new(interval: Duration, enabled: bool) -> Self {
        Self {
            interval,
            enabled,
            last_emit: None,
        }
    }
    pub fn from_config(config: &ScopeConfig) -> Self {
        Self::new(config.refresh_interval(), config.throttle_enabled)
    }
    pub fn reconfigure(&mut self, interval: Duration, enabled: bool) {
        self.interval = interval;
        self.enabled = enabled;
    }
    pub fn state(&self, now: Instant) -> ThrottleState {
        match self.last_emit {
            Some(last) if self.enabled && now.saturating_duration_since(last) < self.interval => {
                ThrottleState::Suppressed
            }
            _ => ThrottleState::Idle,
        }
    }
    /// Called on each frame arrival. Returns whether derived outputs should be recomputed,
    /// and if so records `now` as the last emit.
    pub fn admit(&mut self, now: Instant) -> bool {
        match self.state(now) {
            ThrottleState::Idle => {
                self.last_emit = Some(now);
                true
            }
            ThrottleState::Suppressed => false,
        }
    }
    /// Records a recompute that happened outside `admit`.
    pub fn mark_emitted(&mut self, now: Instant) {
        self.last_emit = Some(now);
    }
    pub fn last_emit(&self) -> Option<Instant> {
        self.last_emit
    }
}
