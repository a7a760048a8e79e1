//! Offline spectral analysis for rendered buffers
//!
//! Used by the CLI and the integration tests to compare the spectrum of a
//! chain's output against its input. Not meant for the render thread: every
//! call plans an FFT and allocates.

use cadence_core::domain::audio::{gain_to_db, peak_level};
use rustfft::{num_complex::Complex, FftPlanner};

/// Single-sided magnitude spectrum
#[derive(Debug, Clone)]
pub struct Spectrum {
    /// Width of one bin in Hz
    pub bin_hz: f32,
    /// Linear amplitude per bin, `0..=N/2`; a full-scale sine reads about 1.0
    pub magnitudes: Vec<f32>,
}

fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
            0.5 - 0.5 * phase.cos()
        })
        .collect()
}

/// Hann-windowed magnitude spectrum of `samples`
pub fn magnitude_spectrum(samples: &[f32], sample_rate: f32) -> Spectrum {
    let n = samples.len();
    if n == 0 {
        return Spectrum {
            bin_hz: 0.0,
            magnitudes: Vec::new(),
        };
    }

    let window = hann_window(n);
    let window_sum: f32 = window.iter().sum();

    let mut buffer: Vec<Complex<f32>> = samples
        .iter()
        .zip(&window)
        .map(|(&s, &w)| Complex::new(s * w, 0.0))
        .collect();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    // Coherent gain of the window, doubled for the folded negative half
    let scale = 2.0 / window_sum;
    let magnitudes = buffer[..=n / 2].iter().map(|c| c.norm() * scale).collect();

    Spectrum {
        bin_hz: sample_rate / n as f32,
        magnitudes,
    }
}

impl Spectrum {
    /// Center frequency of the strongest bin (DC excluded)
    pub fn dominant_frequency(&self) -> f32 {
        self.magnitudes
            .iter()
            .enumerate()
            .skip(1)
            .fold((0, 0.0_f32), |best, (i, &m)| if m > best.1 { (i, m) } else { best })
            .0 as f32
            * self.bin_hz
    }

    /// Magnitude of the bin nearest `freq`
    pub fn magnitude_at(&self, freq: f32) -> f32 {
        if self.bin_hz <= 0.0 {
            return 0.0;
        }
        let bin = (freq / self.bin_hz).round() as usize;
        self.magnitudes.get(bin).copied().unwrap_or(0.0)
    }
}

/// Largest level difference in dB between two spectra, over bins where
/// `reference` is within `range_db` of its own peak
///
/// Both spectra must come from equal-length buffers at the same rate.
pub fn spectral_deviation_db(reference: &Spectrum, other: &Spectrum, range_db: f32) -> f32 {
    let peak = reference.magnitudes.iter().copied().fold(0.0_f32, f32::max);
    let floor = peak * 10.0_f32.powf(-range_db / 20.0);

    reference
        .magnitudes
        .iter()
        .zip(&other.magnitudes)
        .filter(|(&r, _)| r > floor && r > 0.0)
        .map(|(&r, &o)| (gain_to_db(o) - gain_to_db(r)).abs())
        .fold(0.0_f32, f32::max)
}

/// Peak level of a buffer in dBFS
pub fn peak_dbfs(samples: &[f32]) -> f32 {
    gain_to_db(peak_level(samples))
}
