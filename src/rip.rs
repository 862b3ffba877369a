// src/rip.rs
use crate::body::{BodySnapshot, JointType};
use std::time::{Duration, Instant};

pub const DEFAULT_RIP_INTERVAL: Duration = Duration::from_millis(1500);

/// Debounced trigger for the "rip" pose (left wrist above the left elbow).
#[derive(Debug, Clone)]
pub struct RipTimer {
    min_interval: Duration,
    last_fire: Option<Instant>,
}

impl Default for RipTimer {
    fn default() -> Self {
        Self::new(DEFAULT_RIP_INTERVAL)
    }
}

impl RipTimer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_fire: None,
        }
    }

    #[cfg(test)]
    pub fn last_fire(&self) -> Option<Instant> {
        self.last_fire
    }

    /// Feed one frame where the gate already holds.
    pub fn update(&mut self, now: Instant) -> bool {
        let ready = match self.last_fire {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        };
        if ready {
            self.last_fire = Some(now);
        }
        ready
    }

    pub fn gate(body: &BodySnapshot) -> Option<bool> {
        let elbow = body.position(JointType::ElbowLeft)?;
        let wrist = body.position(JointType::WristLeft)?;
        Some(elbow.y < wrist.y)
    }

    /// Ungated or untracked frames leave the timer untouched.
    pub fn observe(&mut self, body: &BodySnapshot, now: Instant) -> bool {
        match Self::gate(body) {
            Some(true) => self.update(now),
            _ => false,
        }
    }
}
