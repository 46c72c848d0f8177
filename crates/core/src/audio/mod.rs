//! Host-analyser front end: raw PCM in, the spectrum/time-domain buffer pair
//! the feature extractor consumes out.

use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{
    config::{DEFAULT_MAX_DECIBELS, DEFAULT_MIN_DECIBELS},
    AudioConfig, PuppetError, Result,
};

mod signal;

pub use signal::TestSignal;

/// Windowed real FFT over the most recent `fft_size` samples.
///
/// Reports `fft_size / 2` magnitude bins and the latest `fft_size / 2` samples
/// of the block. Each bin's level is taken in decibels relative to a
/// full-scale sine and mapped linearly from `min_decibels..max_decibels` onto
/// `0..=max_magnitude`, the same byte layout a browser analyser hands out.
pub struct SpectrumAnalyser {
    fft_size: usize,
    max_magnitude: f32,
    min_decibels: f32,
    max_decibels: f32,
    plan: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    window_gain: f32,
    input: Vec<f32>,
    scratch: Vec<Complex32>,
    output: Vec<Complex32>,
    magnitudes: Vec<f32>,
    time_domain: Vec<f32>,
}

impl SpectrumAnalyser {
    pub fn new(fft_size: usize, max_magnitude: f32) -> Result<Self> {
        if fft_size < 2 || !fft_size.is_power_of_two() {
            return Err(PuppetError::config(format!(
                "fft size must be a power of two >= 2, got {fft_size}"
            )));
        }
        if !(max_magnitude > 0.0 && max_magnitude.is_finite()) {
            return Err(PuppetError::config(format!(
                "max magnitude must be positive, got {max_magnitude}"
            )));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(fft_size);
        let window: Vec<f32> = (0..fft_size).map(|i| hann_value(i, fft_size)).collect();
        let window_gain = window.iter().sum::<f32>().max(f32::EPSILON);
        let bins = fft_size / 2;

        Ok(Self {
            fft_size,
            max_magnitude,
            min_decibels: DEFAULT_MIN_DECIBELS,
            max_decibels: DEFAULT_MAX_DECIBELS,
            input: plan.make_input_vec(),
            scratch: plan.make_scratch_vec(),
            output: plan.make_output_vec(),
            plan,
            window,
            window_gain,
            magnitudes: vec![0.0; bins],
            time_domain: vec![0.0; bins],
        })
    }

    pub fn from_config(audio: &AudioConfig, max_magnitude: f32) -> Result<Self> {
        Self::new(audio.fft_size, max_magnitude)?
            .with_decibels(audio.min_decibels, audio.max_decibels)
    }

    /// Replaces the level window mapped onto `0..=max_magnitude`.
    pub fn with_decibels(mut self, min_decibels: f32, max_decibels: f32) -> Result<Self> {
        if !(min_decibels.is_finite() && max_decibels.is_finite() && min_decibels < max_decibels)
        {
            return Err(PuppetError::config(format!(
                "decibel range must satisfy min < max, got {min_decibels}..{max_decibels}"
            )));
        }
        self.min_decibels = min_decibels;
        self.max_decibels = max_decibels;
        Ok(self)
    }

    pub fn decibel_range(&self) -> (f32, f32) {
        (self.min_decibels, self.max_decibels)
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Analyses the tail of `samples`, zero-padding at the front when the block
    /// is shorter than the transform.
    pub fn process(&mut self, samples: &[f32]) -> Result<()> {
        let take = samples.len().min(self.fft_size);
        let tail = &samples[samples.len() - take..];
        let pad = self.fft_size - take;

        self.input[..pad].fill(0.0);
        for (offset, sample) in tail.iter().enumerate() {
            let index = pad + offset;
            self.input[index] = clamp_sample(*sample) * self.window[index];
        }

        self.plan
            .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)?;

        let gain = 2.0 / self.window_gain;
        let decibels = (self.min_decibels, self.max_decibels);
        for (magnitude, bin) in self.magnitudes.iter_mut().zip(&self.output) {
            *magnitude = level(bin.norm() * gain, decibels, self.max_magnitude);
        }

        let bins = self.bin_count();
        let recent = tail.len().min(bins);
        let lead = bins - recent;
        self.time_domain[..lead].fill(0.0);
        for (slot, sample) in self.time_domain[lead..]
            .iter_mut()
            .zip(&tail[tail.len() - recent..])
        {
            *slot = clamp_sample(*sample);
        }
        Ok(())
    }

    pub fn spectrum(&self) -> &[f32] {
        &self.magnitudes
    }

    pub fn time_domain(&self) -> &[f32] {
        &self.time_domain
    }
}

impl fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("fft_size", &self.fft_size)
            .field("max_magnitude", &self.max_magnitude)
            .field("min_decibels", &self.min_decibels)
            .field("max_decibels", &self.max_decibels)
            .finish()
    }
}

/// Maps a linear amplitude (1.0 = full-scale sine) onto `0..=max_magnitude`
/// through the `(min, max)` decibel window.
fn level(amplitude: f32, (min_db, max_db): (f32, f32), max_magnitude: f32) -> f32 {
    let decibels = 20.0 * amplitude.log10();
    if !decibels.is_finite() {
        return 0.0;
    }
    let t = (decibels - min_db) / (max_db - min_db);
    (t * max_magnitude).clamp(0.0, max_magnitude)
}

fn clamp_sample(sample: f32) -> f32 {
    if sample.is_finite() {
        sample.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        sine_at(1.0, freq, sample_rate, len)
    }

    fn sine_at(amplitude: f32, freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn rejects_odd_sizes() {
        assert!(SpectrumAnalyser::new(1000, 255.0).is_err());
        assert!(SpectrumAnalyser::new(1, 255.0).is_err());
    }

    #[test]
    fn rejects_bad_scales() {
        assert!(SpectrumAnalyser::new(256, 0.0).is_err());
        assert!(SpectrumAnalyser::new(256, -255.0).is_err());
        let analyser = SpectrumAnalyser::new(256, 255.0).unwrap();
        assert!(analyser.with_decibels(-30.0, -100.0).is_err());
    }

    #[test]
    fn levels_map_linearly_in_decibels() {
        // 100 dB window over 255 steps: a sine 20 dB down drops by 51.
        let mut analyser = SpectrumAnalyser::new(256, 255.0).unwrap();
        analyser.process(&sine(1_000.0, 25_600.0, 256)).unwrap();
        let loud = analyser.spectrum()[10];
        analyser.process(&sine_at(0.1, 1_000.0, 25_600.0, 256)).unwrap();
        let quiet = analyser.spectrum()[10];

        assert!((loud - quiet - 51.0).abs() < 1.0, "{loud} vs {quiet}");
    }

    #[test]
    fn quiet_sine_still_clears_the_window() {
        // -12 dBFS sits well inside the default window instead of vanishing.
        let mut analyser = SpectrumAnalyser::new(256, 255.0).unwrap();
        analyser.process(&sine_at(0.25, 1_000.0, 25_600.0, 256)).unwrap();
        let peak = analyser.spectrum()[10];
        assert!(peak > 200.0 && peak < 240.0, "peak {peak}");
    }

    #[test]
    fn silence_produces_empty_buffers() {
        let mut analyser = SpectrumAnalyser::new(256, 255.0).unwrap();
        analyser.process(&[0.0; 256]).unwrap();
        assert_eq!(analyser.spectrum().len(), 128);
        assert!(analyser.spectrum().iter().all(|m| *m == 0.0));
        assert!(analyser.time_domain().iter().all(|s| *s == 0.0));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        // 256-point transform at 25.6 kHz: 100 Hz per bin.
        let mut analyser = SpectrumAnalyser::new(256, 255.0).unwrap();
        analyser.process(&sine(1_000.0, 25_600.0, 256)).unwrap();

        let spectrum = analyser.spectrum();
        let (peak, magnitude) = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, m)| (i, *m))
            .unwrap();
        assert_eq!(peak, 10);
        assert!(magnitude > 200.0 && magnitude <= 255.0);
    }

    #[test]
    fn short_blocks_are_padded() {
        let mut analyser = SpectrumAnalyser::new(64, 255.0).unwrap();
        analyser.process(&[0.5, 2.0]).unwrap();
        let time = analyser.time_domain();
        assert_eq!(time.len(), 32);
        assert_eq!(&time[30..], &[0.5, 1.0]);
        assert!(time[..30].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn hann_window_shape() {
        let size = 1024;
        assert!(hann_value(0, size).abs() < 0.01);
        assert!(hann_value(size - 1, size).abs() < 0.01);
        assert!((hann_value(size / 2, size) - 1.0).abs() < 0.01);
    }
}
