//! Dominant-bin pitch estimate and pitch-class folding.

/// Number of pitch classes in a chroma vector.
pub const PITCH_CLASSES: usize = 12;

const A4_HZ: f32 = 440.0;
const A4_MIDI: f32 = 69.0;
const CHROMA_EPSILON: f32 = 1e-6;

/// Centre frequency of `index` in a spectrum of `bins` bins spanning `0..nyquist`.
pub fn bin_frequency(index: usize, bins: usize, nyquist: f32) -> f32 {
    if bins == 0 {
        return 0.0;
    }
    index as f32 / bins as f32 * nyquist
}

/// Index and magnitude of the loudest bin, DC excluded. Ties keep the lowest index.
pub fn dominant_bin(spectrum: &[f32]) -> Option<(usize, f32)> {
    spectrum
        .iter()
        .enumerate()
        .skip(1)
        .fold(None, |best, (index, &magnitude)| match best {
            Some((_, top)) if top >= magnitude => best,
            _ => Some((index, magnitude)),
        })
}

/// Frequency of the dominant bin, or 0 when it does not clear `floor`.
pub fn estimate_pitch(spectrum: &[f32], nyquist: f32, floor: f32) -> f32 {
    match dominant_bin(spectrum) {
        Some((index, magnitude)) if magnitude > 0.0 && magnitude >= floor => {
            bin_frequency(index, spectrum.len(), nyquist)
        }
        _ => 0.0,
    }
}

/// Pitch class (0 = C, 9 = A) of the semitone nearest to `freq`.
pub fn pitch_class(freq: f32) -> Option<usize> {
    if freq <= 0.0 || !freq.is_finite() {
        return None;
    }
    let midi = (A4_MIDI + 12.0 * (freq / A4_HZ).log2()).round() as i64;
    Some((((midi % 12) + 12) % 12) as usize)
}

/// Folds every bin louder than `floor` into its pitch class and rescales so the
/// strongest class is 1.0. Magnitudes are divided by `max_magnitude` first.
pub fn chroma(
    spectrum: &[f32],
    nyquist: f32,
    floor: f32,
    max_magnitude: f32,
) -> [f32; PITCH_CLASSES] {
    let mut classes = [0.0_f32; PITCH_CLASSES];
    let bins = spectrum.len();

    for (index, &magnitude) in spectrum.iter().enumerate().skip(1) {
        if magnitude <= floor {
            continue;
        }
        if let Some(class) = pitch_class(bin_frequency(index, bins, nyquist)) {
            classes[class] += magnitude / max_magnitude;
        }
    }

    let peak = classes.iter().copied().fold(0.0_f32, f32::max);
    let divisor = if peak > 0.0 { peak } else { CHROMA_EPSILON };
    for value in &mut classes {
        *value = (*value / divisor).clamp(0.0, 1.0);
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_reference_pitches_to_classes() {
        assert_eq!(pitch_class(440.0), Some(9));
        assert_eq!(pitch_class(261.63), Some(0));
        assert_eq!(pitch_class(880.0), Some(9));
        // Far below MIDI 0 still folds into a valid class.
        assert_eq!(pitch_class(4.0), pitch_class(8.0));
        assert_eq!(pitch_class(0.0), None);
    }

    #[test]
    fn dominant_bin_skips_dc() {
        let spectrum = [255.0, 10.0, 40.0, 40.0];
        assert_eq!(dominant_bin(&spectrum), Some((2, 40.0)));
        assert_eq!(dominant_bin(&[5.0]), None);
    }

    #[test]
    fn pitch_is_gated_by_floor() {
        let mut spectrum = vec![0.0; 16];
        spectrum[4] = 50.0;
        assert_eq!(estimate_pitch(&spectrum, 800.0, 100.0), 0.0);
        assert_eq!(estimate_pitch(&spectrum, 800.0, 10.0), 200.0);
        assert_eq!(estimate_pitch(&vec![0.0; 16], 800.0, 0.0), 0.0);
    }

    #[test]
    fn chroma_of_silence_is_zero() {
        let classes = chroma(&[0.0; 64], 1000.0, 1.0, 255.0);
        assert!(classes.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn chroma_peak_is_normalised() {
        // 1024 bins over 10240 Hz: 10 Hz per bin, bin 44 is exactly 440 Hz.
        let mut spectrum = vec![0.0; 1024];
        spectrum[44] = 200.0;
        spectrum[26] = 100.0; // 260 Hz, a C
        let classes = chroma(&spectrum, 10_240.0, 10.0, 255.0);
        assert_eq!(classes[9], 1.0);
        assert!((classes[0] - 0.5).abs() < 1e-6);
    }
}
