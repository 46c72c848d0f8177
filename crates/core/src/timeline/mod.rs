use serde::{Deserialize, Serialize};

/// Session clock advanced by the host's (clamped) tick durations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackClock {
    pub time_seconds: f32,
    pub ticks: u64,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn advance(&mut self, delta: f32) {
        if delta.is_finite() {
            self.time_seconds = (self.time_seconds + delta).max(0.0);
        }
        self.ticks += 1;
    }
}
