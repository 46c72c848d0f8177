use serde::{Deserialize, Serialize};

use crate::BeatConfig;

/// Bass-crossing beat detector with an adaptively decaying threshold.
///
/// A beat fires when the bass band exceeds the threshold and the refractory
/// window has elapsed. Firing spikes the threshold; every other tick decays it
/// towards the floor. Beats that arrive inside the window are dropped.
#[derive(Debug, Clone)]
pub struct BeatDetector {
    config: BeatConfig,
    state: BeatDetectorState,
}

/// Mutable part of the detector, exposed for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatDetectorState {
    pub adaptive_threshold: f32,
    /// `None` until the first beat of the session.
    pub last_beat_timestamp: Option<f32>,
}

impl BeatDetector {
    pub fn new(config: BeatConfig) -> Self {
        let state = BeatDetectorState {
            adaptive_threshold: config.initial_threshold,
            last_beat_timestamp: None,
        };
        Self { config, state }
    }

    pub fn state(&self) -> BeatDetectorState {
        self.state
    }

    pub fn config(&self) -> &BeatConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Feeds one bass reading taken at `now` seconds; returns whether a beat fired.
    pub fn update(&mut self, bass: f32, now: f32) -> bool {
        let outside_window = self
            .state
            .last_beat_timestamp
            .map(|last| now - last > self.config.min_interval)
            .unwrap_or(true);

        if bass > self.state.adaptive_threshold && outside_window {
            self.state.last_beat_timestamp = Some(now);
            self.state.adaptive_threshold = self.config.refractory_threshold;
            return true;
        }

        self.state.adaptive_threshold = (self.state.adaptive_threshold * self.config.decay)
            .max(self.config.threshold_floor);
        false
    }
}
