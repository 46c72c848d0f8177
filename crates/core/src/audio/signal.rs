use std::f32::consts::TAU;

const KICK_HZ: f32 = 60.0;
const KICK_DECAY: f32 = 18.0;
const KICK_LEVEL: f32 = 0.7;
const TONE_HZ: f32 = 440.0;
const TONE_LEVEL: f32 = 0.25;

/// Synthetic kick drum on every beat over a sustained A4 tone.
///
/// Used by the CLI demo and by end-to-end tests of the PCM path.
#[derive(Debug, Clone)]
pub struct TestSignal {
    sample_rate: f32,
    beat_period: f32,
    position: u64,
}

impl TestSignal {
    /// Number of samples [`TestSignal::fill`] keeps around.
    pub const HISTORY: usize = 4096;

    pub fn new(sample_rate: f32, bpm: f32) -> Self {
        Self {
            sample_rate,
            beat_period: 60.0 / bpm.max(1.0),
            position: 0,
        }
    }

    pub fn beat_period(&self) -> f32 {
        self.beat_period
    }

    pub fn next_sample(&mut self) -> f32 {
        let t = self.position as f32 / self.sample_rate;
        self.position += 1;

        let since_beat = t % self.beat_period;
        let kick = (TAU * KICK_HZ * since_beat).sin() * (-since_beat * KICK_DECAY).exp();
        let tone = TONE_LEVEL * (TAU * TONE_HZ * t).sin();
        (KICK_LEVEL * kick + tone).clamp(-1.0, 1.0)
    }

    /// Appends `count` samples and keeps the most recent [`Self::HISTORY`].
    pub fn fill(&mut self, count: usize, history: &mut Vec<f32>) {
        history.extend((0..count).map(|_| self.next_sample()));
        if history.len() > Self::HISTORY {
            let overflow = history.len() - Self::HISTORY;
            history.drain(0..overflow);
        }
    }
}
