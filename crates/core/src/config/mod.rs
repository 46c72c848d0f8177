use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{MotionMapping, MotionMode, PuppetError, Result};

/// Level mapped to zero magnitude, in dB relative to a full-scale sine.
pub const DEFAULT_MIN_DECIBELS: f32 = -100.0;
/// Level mapped to `max_magnitude`.
pub const DEFAULT_MAX_DECIBELS: f32 = 0.0;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub analysis: AnalysisConfig,
    pub motion: MotionConfig,
    pub mapping: MotionMapping,
}

impl AppConfig {
    pub fn live_defaults() -> Self {
        Self::default()
    }

    /// Reads a JSON configuration file. Missing sections fall back to their
    /// defaults; the result is validated before being returned.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.analysis.validate(self.audio.nyquist())?;
        self.motion.validate()
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Transform length; the analyser reports `fft_size / 2` bins.
    pub fft_size: usize,
    /// Bin levels at or below this read as zero magnitude.
    pub min_decibels: f32,
    /// Bin levels at or above this read as `max_magnitude`.
    pub max_decibels: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            fft_size: 2048,
            min_decibels: DEFAULT_MIN_DECIBELS,
            max_decibels: DEFAULT_MAX_DECIBELS,
        }
    }
}

impl AudioConfig {
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 * 0.5
    }

    fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(PuppetError::config("sample rate must be > 0"));
        }
        if self.fft_size < 2 || !self.fft_size.is_power_of_two() {
            return Err(PuppetError::config(format!(
                "fft size must be a power of two >= 2, got {}",
                self.fft_size
            )));
        }
        if !(self.min_decibels.is_finite()
            && self.max_decibels.is_finite()
            && self.min_decibels < self.max_decibels)
        {
            return Err(PuppetError::config(format!(
                "decibel range must satisfy min < max, got {}..{}",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }
}

/// Tuning for the feature extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Upper edge of the bass band.
    pub bass_cutoff_hz: f32,
    /// Lower edge of the treble band.
    pub treble_cutoff_hz: f32,
    /// Largest magnitude the host analyser can report.
    pub max_magnitude: f32,
    /// Empirical scale applied to normalised spectral flux before clamping.
    pub flux_gain: f32,
    /// Pitch noise gate, as a fraction of `max_magnitude`.
    pub pitch_floor: f32,
    /// Per-bin chroma noise gate, as a fraction of `max_magnitude`.
    pub chroma_floor: f32,
    pub beat: BeatConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bass_cutoff_hz: 250.0,
            treble_cutoff_hz: 4_000.0,
            max_magnitude: 255.0,
            flux_gain: 4.0,
            pitch_floor: 0.4,
            chroma_floor: 0.5,
            beat: BeatConfig::default(),
        }
    }
}

impl AnalysisConfig {
    fn validate(&self, nyquist: f32) -> Result<()> {
        if !(self.bass_cutoff_hz > 0.0 && self.bass_cutoff_hz < self.treble_cutoff_hz) {
            return Err(PuppetError::config(
                "band cutoffs must satisfy 0 < bass < treble",
            ));
        }
        if self.treble_cutoff_hz >= nyquist {
            return Err(PuppetError::config(format!(
                "treble cutoff {} Hz must lie below nyquist {} Hz",
                self.treble_cutoff_hz, nyquist
            )));
        }
        if !(self.max_magnitude > 0.0 && self.flux_gain > 0.0) {
            return Err(PuppetError::config(
                "max magnitude and flux gain must be positive",
            ));
        }
        for (name, value) in [
            ("pitch floor", self.pitch_floor),
            ("chroma floor", self.chroma_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PuppetError::config(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        self.beat.validate()
    }
}

/// Constants of the adaptive-threshold beat detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatConfig {
    /// Refractory window in seconds.
    pub min_interval: f32,
    /// Per-tick multiplicative decay of the threshold.
    pub decay: f32,
    pub threshold_floor: f32,
    /// Threshold value set right after a beat fires.
    pub refractory_threshold: f32,
    pub initial_threshold: f32,
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            min_interval: 0.3,
            decay: 0.98,
            threshold_floor: 0.35,
            refractory_threshold: 1.0,
            initial_threshold: 0.5,
        }
    }
}

impl BeatConfig {
    fn validate(&self) -> Result<()> {
        if !(self.decay > 0.0 && self.decay < 1.0) {
            return Err(PuppetError::config(format!(
                "beat decay must lie in (0, 1), got {}",
                self.decay
            )));
        }
        if self.min_interval < 0.0 {
            return Err(PuppetError::config("beat interval must not be negative"));
        }
        if self.threshold_floor < 0.0 || self.refractory_threshold < self.threshold_floor {
            return Err(PuppetError::config(
                "beat thresholds must satisfy 0 <= floor <= refractory",
            ));
        }
        Ok(())
    }
}

/// Stiffness and damping of one spring-damper system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringParams {
    pub stiffness: f32,
    pub damping: f32,
}

impl SpringParams {
    pub const fn new(stiffness: f32, damping: f32) -> Self {
        Self { stiffness, damping }
    }

    /// Damping that makes a unit-mass spring of this stiffness critically damped.
    pub fn critical(stiffness: f32) -> Self {
        Self::new(stiffness, 2.0 * stiffness.max(0.0).sqrt())
    }
}

/// Tuning for pose selection and the joint solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Longest tick the solver integrates; larger values are clamped.
    pub max_dt: f32,
    /// Longest single integration step inside one tick.
    pub max_substep: f32,
    pub dance: SpringParams,
    pub sequence: SpringParams,
    pub editing: SpringParams,
    /// Energy above which the procedural policy may force the energetic pose.
    pub energetic_threshold: f32,
    /// Probability of forcing the energetic pose when above the threshold.
    pub energetic_bias: f64,
    pub energetic_pose: usize,
    /// Rate (1/s) at which the beat knee-bend envelope relaxes.
    pub knee_release: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            max_dt: 0.1,
            max_substep: 1.0 / 60.0,
            dance: SpringParams::new(80.0, 14.0),
            sequence: SpringParams::new(90.0, 16.0),
            editing: SpringParams::critical(220.0),
            energetic_threshold: 0.6,
            energetic_bias: 0.5,
            energetic_pose: 1,
            knee_release: 6.0,
        }
    }
}

impl MotionConfig {
    /// Shortest integration step accepted; bounds the sub-steps per tick.
    pub const MIN_SUBSTEP: f32 = 1e-4;

    pub fn spring_for(&self, mode: MotionMode) -> SpringParams {
        match mode {
            MotionMode::Editing => self.editing,
            MotionMode::SequencePlayback => self.sequence,
            MotionMode::ProceduralDance => self.dance,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.max_dt > 0.0 && self.max_dt.is_finite()) {
            return Err(PuppetError::config("max dt must be positive"));
        }
        if !(self.max_substep >= Self::MIN_SUBSTEP && self.max_substep <= self.max_dt) {
            return Err(PuppetError::config(format!(
                "max substep must lie in [{}, max dt], got {}",
                Self::MIN_SUBSTEP,
                self.max_substep
            )));
        }
        for (name, spring) in [
            ("dance", self.dance),
            ("sequence", self.sequence),
            ("editing", self.editing),
        ] {
            if spring.stiffness <= 0.0 || spring.damping < 0.0 {
                return Err(PuppetError::config(format!(
                    "{name} spring needs positive stiffness and non-negative damping"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.energetic_bias) {
            return Err(PuppetError::config("energetic bias must lie in [0, 1]"));
        }
        if self.knee_release < 0.0 {
            return Err(PuppetError::config("knee release must not be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config =
            AppConfig::from_json(r#"{ "analysis": { "beat": { "decay": 0.9 } } }"#).unwrap();
        assert_eq!(config.analysis.beat.decay, 0.9);
        assert_eq!(config.analysis.beat.min_interval, 0.3);
        assert_eq!(config.audio, AudioConfig::default());
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = AppConfig::default();
        config.audio.fft_size = 1000;
        assert!(matches!(
            config.validate(),
            Err(PuppetError::InvalidConfig(_))
        ));

        let mut config = AppConfig::default();
        config.analysis.beat.decay = 1.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.analysis.treble_cutoff_hz = 30_000.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.audio.min_decibels = -20.0;
        config.audio.max_decibels = -30.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn substep_is_bounded() {
        for substep in [1e-9, 0.0, -1.0, f32::NAN, 0.5] {
            let mut config = AppConfig::default();
            config.motion.max_substep = substep;
            assert!(
                matches!(config.validate(), Err(PuppetError::InvalidConfig(_))),
                "accepted substep {substep}"
            );
        }

        let mut config = AppConfig::default();
        config.motion.max_substep = MotionConfig::MIN_SUBSTEP;
        config.validate().unwrap();
    }

    #[test]
    fn round_trips_through_json() {
        let config = AppConfig::default();
        let raw = config.to_json_pretty().unwrap();
        assert_eq!(AppConfig::from_json(&raw).unwrap(), config);
    }

    #[test]
    fn editing_spring_is_stiffer() {
        let motion = MotionConfig::default();
        let editing = motion.spring_for(MotionMode::Editing);
        let dance = motion.spring_for(MotionMode::ProceduralDance);
        assert!(editing.stiffness > dance.stiffness);
        assert!(editing.damping > dance.damping);
    }
}
