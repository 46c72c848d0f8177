use std::{fmt, ops::Range, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{AnalysisConfig, PuppetError};

mod beat;
pub mod pitch;

pub use beat::{BeatDetector, BeatDetectorState};
pub use pitch::PITCH_CLASSES;

const MAX_BEAT_HISTORY: usize = 32;

/// Summary of the analysis metadata accumulated so far.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AnalysisSummary {
    pub sample_rate: u32,
    pub frames_analysed: u64,
    pub beats_detected: u64,
    pub tempo_bpm: Option<f32>,
}

/// Normalised average magnitude of the three fixed spectral bands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

impl Bands {
    pub fn mean(&self) -> f32 {
        (self.bass + self.mid + self.treble) / 3.0
    }
}

/// Feature set for a single analysis tick.
///
/// Every field except `pitch` (Hz) and `time` (seconds) lies in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureFrame {
    pub time: f32,
    pub bands: Bands,
    pub energy: f32,
    pub rms: f32,
    /// Magnitude-weighted mean bin index divided by the bin count.
    pub spectral_centroid: f32,
    pub spectral_flux: f32,
    /// 0 when no bin clears the noise gate.
    pub pitch: f32,
    pub chroma: [f32; PITCH_CLASSES],
    pub is_beat: bool,
}

impl FeatureFrame {
    /// All-zero frame stamped at `time`.
    pub fn silent(time: f32) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }

    /// Raw value of the named field.
    pub fn value(&self, kind: FeatureKind) -> f32 {
        match kind {
            FeatureKind::Bass => self.bands.bass,
            FeatureKind::Mid => self.bands.mid,
            FeatureKind::Treble => self.bands.treble,
            FeatureKind::Energy => self.energy,
            FeatureKind::Rms => self.rms,
            FeatureKind::SpectralCentroid => self.spectral_centroid,
            FeatureKind::SpectralFlux => self.spectral_flux,
            FeatureKind::Pitch => self.pitch,
        }
    }
}

/// Scalar fields of a [`FeatureFrame`] that can drive a motion channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureKind {
    Bass,
    Mid,
    Treble,
    Energy,
    Rms,
    SpectralCentroid,
    SpectralFlux,
    Pitch,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 8] = [
        FeatureKind::Bass,
        FeatureKind::Mid,
        FeatureKind::Treble,
        FeatureKind::Energy,
        FeatureKind::Rms,
        FeatureKind::SpectralCentroid,
        FeatureKind::SpectralFlux,
        FeatureKind::Pitch,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FeatureKind::Bass => "bass",
            FeatureKind::Mid => "mid",
            FeatureKind::Treble => "treble",
            FeatureKind::Energy => "energy",
            FeatureKind::Rms => "rms",
            FeatureKind::SpectralCentroid => "spectralCentroid",
            FeatureKind::SpectralFlux => "spectralFlux",
            FeatureKind::Pitch => "pitch",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureKind {
    type Err = PuppetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| PuppetError::msg(format!("unknown feature `{s}`")))
    }
}

/// Turns one magnitude spectrum plus one time-domain block per tick into a
/// [`FeatureFrame`].
///
/// The only state carried between calls is the previous spectrum (for flux),
/// the beat detector and the running summary. Degenerate input never fails:
/// an empty buffer yields a silent frame and leaves the state untouched.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: AnalysisConfig,
    sample_rate: u32,
    previous_spectrum: Vec<f32>,
    beat: BeatDetector,
    summary: AnalysisSummary,
    beat_timestamps: Vec<f32>,
}

impl FeatureExtractor {
    /// Builds an extractor. A non-positive `max_magnitude` is raised to the
    /// smallest positive value so analysis stays total.
    pub fn new(sample_rate: u32, mut config: AnalysisConfig) -> Self {
        if config.max_magnitude.is_nan() || config.max_magnitude <= 0.0 {
            tracing::warn!(
                max_magnitude = config.max_magnitude,
                "non-positive max magnitude, using epsilon"
            );
            config.max_magnitude = f32::EPSILON;
        }
        let beat = BeatDetector::new(config.beat.clone());
        Self {
            config,
            sample_rate,
            previous_spectrum: Vec::new(),
            beat,
            summary: AnalysisSummary {
                sample_rate,
                ..Default::default()
            },
            beat_timestamps: Vec::new(),
        }
    }

    /// Creates an extractor with default tuning at the provided sample rate.
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self::new(sample_rate, AnalysisConfig::default())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Returns metadata collected so far about the analysed stream.
    pub fn summary(&self) -> &AnalysisSummary {
        &self.summary
    }

    pub fn beat_state(&self) -> BeatDetectorState {
        self.beat.state()
    }

    /// Clears the previous spectrum, the beat detector and the summary while
    /// preserving configuration.
    pub fn reset(&mut self) {
        self.previous_spectrum.clear();
        self.beat.reset();
        self.summary = AnalysisSummary {
            sample_rate: self.sample_rate,
            ..Default::default()
        };
        self.beat_timestamps.clear();
    }

    fn nyquist(&self) -> f32 {
        self.sample_rate as f32 * 0.5
    }

    /// Analyses one tick. `spectrum` holds magnitudes in `[0, max_magnitude]`,
    /// `time_domain` holds samples in `[-1, 1]` and `now` is the host clock in
    /// seconds.
    pub fn analyze(&mut self, spectrum: &[f32], time_domain: &[f32], now: f32) -> FeatureFrame {
        if spectrum.is_empty() || time_domain.is_empty() {
            return FeatureFrame::silent(now);
        }

        let max_magnitude = self.config.max_magnitude;
        let spectrum: Vec<f32> = spectrum
            .iter()
            .map(|&magnitude| sanitize(magnitude, 0.0, max_magnitude))
            .collect();

        let ranges = band_ranges(
            spectrum.len(),
            self.nyquist(),
            self.config.bass_cutoff_hz,
            self.config.treble_cutoff_hz,
        );
        let bands = Bands {
            bass: band_mean(&spectrum[ranges[0].clone()], max_magnitude),
            mid: band_mean(&spectrum[ranges[1].clone()], max_magnitude),
            treble: band_mean(&spectrum[ranges[2].clone()], max_magnitude),
        };

        let rms = compute_rms(time_domain);
        let spectral_centroid = compute_centroid(&spectrum);
        let spectral_flux = self.compute_flux(&spectrum);
        self.previous_spectrum = spectrum;
        let spectrum = &self.previous_spectrum;

        let pitch = pitch::estimate_pitch(
            spectrum,
            self.nyquist(),
            self.config.pitch_floor * max_magnitude,
        );
        let chroma = if pitch > 0.0 {
            pitch::chroma(
                spectrum,
                self.nyquist(),
                self.config.chroma_floor * max_magnitude,
                max_magnitude,
            )
        } else {
            [0.0; PITCH_CLASSES]
        };

        let is_beat = self.beat.update(bands.bass, now);
        self.summary.frames_analysed += 1;
        if is_beat {
            tracing::debug!(time = now, bass = bands.bass, "beat detected");
            self.record_beat(now);
        }

        FeatureFrame {
            time: now,
            energy: bands.mean(),
            bands,
            rms,
            spectral_centroid,
            spectral_flux,
            pitch,
            chroma,
            is_beat,
        }
    }

    /// Analyses byte buffers in the common browser-analyser layout: magnitudes
    /// in `0..=255`, time-domain samples centred at 128.
    pub fn analyze_bytes(&mut self, spectrum: &[u8], time_domain: &[u8], now: f32) -> FeatureFrame {
        let spectrum: Vec<f32> = spectrum.iter().map(|&value| value as f32).collect();
        let time_domain: Vec<f32> = time_domain
            .iter()
            .map(|&value| (value as f32 - 128.0) / 128.0)
            .collect();
        self.analyze(&spectrum, &time_domain, now)
    }

    fn compute_flux(&self, spectrum: &[f32]) -> f32 {
        let rise: f32 = if self.previous_spectrum.len() == spectrum.len() {
            spectrum
                .iter()
                .zip(&self.previous_spectrum)
                .map(|(current, previous)| (current - previous).max(0.0))
                .sum()
        } else {
            spectrum.iter().sum()
        };
        let normalised = rise / (spectrum.len() as f32 * self.config.max_magnitude);
        (normalised * self.config.flux_gain).clamp(0.0, 1.0)
    }

    fn record_beat(&mut self, timestamp: f32) {
        self.summary.beats_detected += 1;
        self.beat_timestamps.push(timestamp);
        if self.beat_timestamps.len() > MAX_BEAT_HISTORY {
            let overflow = self.beat_timestamps.len() - MAX_BEAT_HISTORY;
            self.beat_timestamps.drain(0..overflow);
        }
        self.update_tempo_estimate();
    }

    fn update_tempo_estimate(&mut self) {
        if self.beat_timestamps.len() < 2 {
            return;
        }

        let mut sum = 0.0;
        let mut count = 0;
        for window in self.beat_timestamps.windows(2) {
            let interval = window[1] - window[0];
            if interval > f32::EPSILON {
                sum += interval;
                count += 1;
            }
        }

        if count > 0 {
            let average_interval = sum / count as f32;
            if average_interval > 0.0 {
                self.summary.tempo_bpm = Some(60.0 / average_interval);
            }
        }
    }
}

/// Splits `bins` bins into contiguous bass/mid/treble ranges at the two
/// cutoffs. The bass range always holds at least one bin.
pub fn band_ranges(bins: usize, nyquist: f32, bass_hz: f32, treble_hz: f32) -> [Range<usize>; 3] {
    let hz_to_bin = |hz: f32| -> usize {
        if nyquist <= 0.0 {
            return bins;
        }
        (hz / nyquist * bins as f32).round().max(0.0) as usize
    };
    let bass_end = hz_to_bin(bass_hz).clamp(1.min(bins), bins);
    let treble_start = hz_to_bin(treble_hz).clamp(bass_end, bins);
    [0..bass_end, bass_end..treble_start, treble_start..bins]
}

fn band_mean(range: &[f32], max_magnitude: f32) -> f32 {
    if range.is_empty() {
        return 0.0;
    }
    let mean = range.iter().sum::<f32>() / range.len() as f32;
    (mean / max_magnitude).clamp(0.0, 1.0)
}

fn compute_rms(samples: &[f32]) -> f32 {
    let sum: f32 = samples
        .iter()
        .map(|&sample| sanitize(sample, -1.0, 1.0))
        .map(|sample| sample * sample)
        .sum();
    (sum / samples.len() as f32).sqrt().clamp(0.0, 1.0)
}

fn compute_centroid(spectrum: &[f32]) -> f32 {
    let magnitude_sum: f32 = spectrum.iter().sum();
    if magnitude_sum <= f32::EPSILON {
        return 0.0;
    }
    let weighted_sum: f32 = spectrum
        .iter()
        .enumerate()
        .map(|(index, magnitude)| index as f32 * magnitude)
        .sum();
    (weighted_sum / magnitude_sum / spectrum.len() as f32).clamp(0.0, 1.0)
}

fn sanitize(value: f32, min: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const BINS: usize = 1024;

    fn build_extractor(sample_rate: u32) -> FeatureExtractor {
        FeatureExtractor::with_sample_rate(sample_rate)
    }

    fn assert_unit(value: f32, name: &str) {
        assert!((0.0..=1.0).contains(&value), "{name} = {value} out of range");
    }

    #[test]
    fn silence_is_idempotent() {
        let mut extractor = build_extractor(48_000);
        let spectrum = vec![0.0; BINS];
        let samples = vec![0.0; BINS];

        for tick in 0..2 {
            let frame = extractor.analyze(&spectrum, &samples, tick as f32 / 60.0);
            assert!(!frame.is_beat);
            assert_eq!(frame.pitch, 0.0);
            assert!(frame.chroma.iter().all(|value| *value == 0.0));
            assert_eq!(frame.bands, Bands::default());
            assert_eq!(frame.energy, 0.0);
            assert_eq!(frame.rms, 0.0);
            assert_eq!(frame.spectral_centroid, 0.0);
            assert_eq!(frame.spectral_flux, 0.0);
        }
    }

    #[test]
    fn empty_input_yields_silent_frame_without_touching_state() {
        let mut extractor = build_extractor(48_000);
        let frame = extractor.analyze(&[], &[0.5; 8], 1.0);
        assert_eq!(frame, FeatureFrame::silent(1.0));
        assert_eq!(extractor.summary().frames_analysed, 0);
        assert!(extractor.previous_spectrum.is_empty());
    }

    #[test]
    fn bands_follow_cutoffs() {
        // 48 kHz with 1024 bins: ~23.4 Hz per bin, bass ends at bin 11,
        // treble starts at bin 171.
        let ranges = band_ranges(BINS, 24_000.0, 250.0, 4_000.0);
        assert_eq!(ranges[0], 0..11);
        assert_eq!(ranges[1], 11..171);
        assert_eq!(ranges[2], 171..BINS);

        let mut spectrum = vec![0.0; BINS];
        for value in &mut spectrum[0..11] {
            *value = 255.0;
        }
        let mut extractor = build_extractor(48_000);
        let frame = extractor.analyze(&spectrum, &[0.0; BINS], 0.0);
        assert_eq!(frame.bands.bass, 1.0);
        assert_eq!(frame.bands.mid, 0.0);
        assert_eq!(frame.bands.treble, 0.0);
        assert!((frame.energy - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn tiny_spectra_still_split() {
        let ranges = band_ranges(2, 24_000.0, 250.0, 4_000.0);
        assert_eq!(ranges[0], 0..1);
        assert_eq!(ranges[1], 1..1);
        assert_eq!(ranges[2], 1..2);
    }

    #[test]
    fn rms_of_full_scale_square_is_one() {
        let mut extractor = build_extractor(48_000);
        let samples: Vec<f32> = (0..BINS)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let frame = extractor.analyze(&[0.0; BINS], &samples, 0.0);
        assert!((frame.rms - 1.0).abs() < 1e-6);
    }

    #[test]
    fn byte_buffers_are_recentred() {
        let mut extractor = build_extractor(48_000);
        let frame = extractor.analyze_bytes(&[0; 64], &[128; 64], 0.0);
        assert_eq!(frame.rms, 0.0);

        let frame = extractor.analyze_bytes(&[0; 64], &[0; 64], 0.1);
        assert!((frame.rms - 1.0).abs() < 1e-6);
    }

    #[test]
    fn centroid_tracks_brightness() {
        let mut extractor = build_extractor(48_000);
        let mut spectrum = vec![0.0; 100];
        spectrum[50] = 100.0;
        let frame = extractor.analyze(&spectrum, &[0.0; 100], 0.0);
        assert!((frame.spectral_centroid - 0.5).abs() < 1e-6);
    }

    #[test]
    fn flux_only_counts_rises() {
        let mut extractor = build_extractor(48_000);
        let loud = vec![255.0; 64];
        let quiet = vec![0.0; 64];

        let rising = extractor.analyze(&loud, &[0.0; 64], 0.0);
        assert_eq!(rising.spectral_flux, 1.0);

        let steady = extractor.analyze(&loud, &[0.0; 64], 0.1);
        assert_eq!(steady.spectral_flux, 0.0);

        let falling = extractor.analyze(&quiet, &[0.0; 64], 0.2);
        assert_eq!(falling.spectral_flux, 0.0);
    }

    #[test]
    fn chroma_concentrated_at_a4() {
        // 20480 Hz over 1024 bins: 10 Hz per bin, bin 44 is exactly 440 Hz.
        let mut extractor = build_extractor(20_480);
        let mut spectrum = vec![0.0; BINS];
        spectrum[44] = 255.0;
        let frame = extractor.analyze(&spectrum, &[0.0; BINS], 0.0);

        assert!((frame.pitch - 440.0).abs() < 1e-3);
        assert_eq!(frame.chroma[9], 1.0);
        for (class, value) in frame.chroma.iter().enumerate() {
            if class != 9 {
                assert!(*value < 1.0);
            }
        }
    }

    #[test]
    fn negative_scale_does_not_panic() {
        let config = AnalysisConfig {
            max_magnitude: -255.0,
            ..Default::default()
        };
        let mut extractor = FeatureExtractor::new(48_000, config);
        assert_eq!(extractor.config().max_magnitude, f32::EPSILON);

        let frame = extractor.analyze(&vec![128.0; BINS], &vec![0.5; BINS], 0.0);
        assert_unit(frame.bands.bass, "bass");
        assert_unit(frame.spectral_flux, "flux");
        for value in frame.chroma {
            assert_unit(value, "chroma");
        }
    }

    #[test]
    fn quiet_peak_reports_no_pitch() {
        let mut extractor = build_extractor(20_480);
        let mut spectrum = vec![0.0; BINS];
        spectrum[44] = 20.0;
        let frame = extractor.analyze(&spectrum, &[0.0; BINS], 0.0);
        assert_eq!(frame.pitch, 0.0);
        assert!(frame.chroma.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn periodic_bass_updates_tempo() {
        let mut extractor = build_extractor(48_000);
        let mut kick = vec![0.0; BINS];
        for value in &mut kick[0..11] {
            *value = 255.0;
        }
        let silence = vec![0.0; BINS];

        // 60 Hz ticks with a kick every 30 ticks: 120 BPM.
        for tick in 0..240 {
            let spectrum = if tick % 30 == 0 { &kick } else { &silence };
            extractor.analyze(spectrum, &silence, tick as f32 / 60.0);
        }

        let summary = extractor.summary();
        assert_eq!(summary.frames_analysed, 240);
        assert_eq!(summary.beats_detected, 8);
        let tempo = summary.tempo_bpm.expect("tempo should be detected");
        assert!((tempo - 120.0).abs() < 1.0);
    }

    #[test]
    fn reset_clears_history() {
        let mut extractor = build_extractor(48_000);
        let loud = vec![255.0; 64];
        assert!(extractor.analyze(&loud, &[0.0; 64], 0.0).is_beat);
        extractor.reset();

        assert_eq!(extractor.summary().frames_analysed, 0);
        assert_eq!(extractor.beat_state().last_beat_timestamp, None);
        // Flux is measured against silence again.
        let frame = extractor.analyze(&loud, &[0.0; 64], 0.01);
        assert_eq!(frame.spectral_flux, 1.0);
        assert!(frame.is_beat);
    }

    #[test]
    fn feature_names_round_trip() {
        for kind in FeatureKind::ALL {
            assert_eq!(kind.to_string().parse::<FeatureKind>().unwrap(), kind);
        }
        assert!("loudness".parse::<FeatureKind>().is_err());
        assert_eq!(
            serde_json::to_string(&FeatureKind::SpectralCentroid).unwrap(),
            "\"spectralCentroid\""
        );
    }

    proptest! {
        #[test]
        fn normalised_fields_stay_in_range(
            spectrum in prop::collection::vec(-50.0f32..400.0, 1..256),
            samples in prop::collection::vec(-2.0f32..2.0, 1..256),
        ) {
            let mut extractor = build_extractor(44_100);
            let bin_hz = 22_050.0 / spectrum.len() as f32;
            for tick in 0..3 {
                let frame = extractor.analyze(&spectrum, &samples, tick as f32 * 0.1);
                assert_unit(frame.bands.bass, "bass");
                assert_unit(frame.bands.mid, "mid");
                assert_unit(frame.bands.treble, "treble");
                assert_unit(frame.energy, "energy");
                assert_unit(frame.rms, "rms");
                assert_unit(frame.spectral_centroid, "centroid");
                assert_unit(frame.spectral_flux, "flux");
                for value in frame.chroma {
                    assert_unit(value, "chroma");
                }
                prop_assert!(frame.pitch == 0.0 || frame.pitch >= bin_hz * 0.999);
            }
        }

        #[test]
        fn beats_respect_refractory_window(
            levels in prop::collection::vec(0.0f32..255.0, 1..400),
            steps in prop::collection::vec(0.001f32..0.2, 400),
        ) {
            let mut extractor = build_extractor(48_000);
            let mut now = 0.0_f32;
            let mut last_beat: Option<f32> = None;
            for (level, step) in levels.iter().zip(&steps) {
                now += step;
                let spectrum = vec![*level; 32];
                let frame = extractor.analyze(&spectrum, &[0.0; 32], now);
                if frame.is_beat {
                    if let Some(last) = last_beat {
                        prop_assert!(now - last > 0.3);
                    }
                    last_beat = Some(now);
                }
            }
        }
    }
}
