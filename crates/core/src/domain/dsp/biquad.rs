//! Second-order IIR sections
//!
//! Coefficient design follows the bilinear-transform (Audio EQ Cookbook)
//! equations. The calculator is pure and does not clamp: callers keep
//! `q > 0` and `0 < freq < sample_rate / 2`.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::trace;

/// Shelf slope used by both shelving designs
///
/// `1/S - 1` inside the alpha square root evaluates to `1/0.9 - 1`.
pub const SHELF_SLOPE: f64 = 0.9;

/// Filter response shapes available to the equalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterShape {
    LowShelf,
    Peaking,
    HighShelf,
}

/// Biquad filter coefficients
///
/// Normalized so that `a0 == 1`. Immutable once computed; a parameter change
/// replaces the whole set. Stored in double precision: low corner frequencies
/// put the poles close to the unit circle, where single precision drifts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    /// Numerator coefficients
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    /// Denominator coefficients (a0 is normalized to 1.0)
    pub a1: f64,
    pub a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        // Unity gain (no filtering)
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

impl BiquadCoeffs {
    /// Design a section of the given shape
    ///
    /// `q` only affects the peaking shape; shelves use [`SHELF_SLOPE`].
    #[must_use]
    pub fn design(shape: FilterShape, sample_rate: f32, freq: f32, gain_db: f32, q: f32) -> Self {
        let coeffs = match shape {
            FilterShape::LowShelf => Self::low_shelf(sample_rate, freq, gain_db),
            FilterShape::Peaking => Self::peaking(sample_rate, freq, gain_db, q),
            FilterShape::HighShelf => Self::high_shelf(sample_rate, freq, gain_db),
        };
        trace!(?shape, freq, gain_db, q, sample_rate, "Biquad designed");
        coeffs
    }

    /// Calculate coefficients for a low shelf filter
    ///
    /// Boosts or cuts frequencies below the corner frequency.
    #[must_use]
    pub fn low_shelf(sample_rate: f32, freq: f32, gain_db: f32) -> Self {
        let a = 10.0_f64.powf(f64::from(gain_db) / 40.0);
        let (cos_w0, alpha) = Self::shelf_terms(sample_rate, freq, a);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        let b0 = a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha);
        let b1 = 2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0);
        let b2 = a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha);

        let a0 = (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha;
        let a1 = -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0);
        let a2 = (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha;

        Self::normalized(b0, b1, b2, a0, a1, a2)
    }

    /// Calculate coefficients for a high shelf filter
    ///
    /// Boosts or cuts frequencies above the corner frequency.
    #[must_use]
    pub fn high_shelf(sample_rate: f32, freq: f32, gain_db: f32) -> Self {
        let a = 10.0_f64.powf(f64::from(gain_db) / 40.0);
        let (cos_w0, alpha) = Self::shelf_terms(sample_rate, freq, a);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        let b0 = a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha);
        let b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0);
        let b2 = a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha);

        let a0 = (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha;
        let a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cos_w0);
        let a2 = (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha;

        Self::normalized(b0, b1, b2, a0, a1, a2)
    }

    /// Calculate coefficients for a peaking EQ filter
    ///
    /// Boosts or cuts frequencies around a center frequency.
    #[must_use]
    pub fn peaking(sample_rate: f32, freq: f32, gain_db: f32, q: f32) -> Self {
        let a = 10.0_f64.powf(f64::from(gain_db) / 40.0);
        let w0 = omega(freq, sample_rate);
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * f64::from(q));

        let b0 = 1.0 + alpha * a;
        let b1 = -2.0 * cos_w0;
        let b2 = 1.0 - alpha * a;

        let a0 = 1.0 + alpha / a;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha / a;

        Self::normalized(b0, b1, b2, a0, a1, a2)
    }

    /// `cos(w0)` and the slope-derived alpha shared by both shelves
    #[inline]
    fn shelf_terms(sample_rate: f32, freq: f32, a: f64) -> (f64, f64) {
        let w0 = omega(freq, sample_rate);
        let alpha = w0.sin() / 2.0 * ((a + 1.0 / a) * (1.0 / SHELF_SLOPE - 1.0) + 2.0).sqrt();
        (w0.cos(), alpha)
    }

    #[inline]
    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Complex transfer function `H(e^{jw})` at a frequency
    pub fn frequency_response(&self, freq: f32, sample_rate: f32) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -omega(freq, sample_rate));
        let z2 = z1 * z1;
        let num = Complex64::new(self.b0, 0.0) + z1 * self.b1 + z2 * self.b2;
        let den = Complex64::new(1.0, 0.0) + z1 * self.a1 + z2 * self.a2;
        num / den
    }

    /// Magnitude response in dB at a frequency
    pub fn magnitude_db(&self, freq: f32, sample_rate: f32) -> f64 {
        20.0 * self.frequency_response(freq, sample_rate).norm().log10()
    }
}

/// Normalized angular frequency `2*pi*f/fs`
#[inline]
fn omega(freq: f32, sample_rate: f32) -> f64 {
    2.0 * PI * f64::from(freq) / f64::from(sample_rate)
}

/// Per-channel Direct Form I history
///
/// Carried forward across calls and blocks; only [`BiquadState::reset`]
/// clears it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BiquadState {
    // Previous input samples (x[n-1], x[n-2])
    x1: f64,
    x2: f64,
    // Previous output samples (y[n-1], y[n-2])
    y1: f64,
    y2: f64,
}

impl BiquadState {
    /// Process a single sample through one section
    #[inline]
    pub fn process(&mut self, coeffs: &BiquadCoeffs, x: f64) -> f64 {
        // Direct Form I: y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
        //                        - a1*y[n-1] - a2*y[n-2]
        let y = coeffs.b0 * x + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y
    }

    /// Process a buffer of samples
    pub fn process_buffer(&mut self, coeffs: &BiquadCoeffs, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(coeffs, f64::from(*sample)) as f32;
        }
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;

    fn sine(samples: usize, freq: f32) -> Vec<f32> {
        (0..samples)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / SR).sin())
            .collect()
    }

    #[test]
    fn test_biquad_unity() {
        let coeffs = BiquadCoeffs::default();
        let mut state = BiquadState::default();

        let input = vec![0.5, 0.3, 0.7];
        let mut output = input.clone();
        state.process_buffer(&coeffs, &mut output);

        assert_eq!(input, output);
    }

    #[test]
    fn test_zero_gain_is_identity_for_all_shapes() {
        for shape in [FilterShape::LowShelf, FilterShape::Peaking, FilterShape::HighShelf] {
            let coeffs = BiquadCoeffs::design(shape, SR, 1000.0, 0.0, 0.707);
            assert!((coeffs.b0 - 1.0).abs() < 1e-12, "{shape:?}: b0={}", coeffs.b0);
            // Numerator and denominator cancel
            assert!((coeffs.b1 - coeffs.a1).abs() < 1e-12);
            assert!((coeffs.b2 - coeffs.a2).abs() < 1e-12);

            let mut state = BiquadState::default();
            let input = sine(2048, 440.0);
            let mut output = input.clone();
            state.process_buffer(&coeffs, &mut output);
            for (x, y) in input.iter().zip(&output) {
                assert!((x - y).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_design_is_deterministic() {
        let a = BiquadCoeffs::peaking(SR, 1234.0, 5.5, 1.3);
        let b = BiquadCoeffs::peaking(SR, 1234.0, 5.5, 1.3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_peaking_gain_at_center() {
        let coeffs = BiquadCoeffs::peaking(SR, 1000.0, 6.0, 1.0);
        assert!((coeffs.magnitude_db(1000.0, SR) - 6.0).abs() < 0.05);
        // Far from the center the response is flat
        assert!(coeffs.magnitude_db(20.0, SR).abs() < 0.1);
    }

    #[test]
    fn test_low_shelf_response() {
        let coeffs = BiquadCoeffs::low_shelf(SR, 200.0, 6.0);
        assert!((coeffs.magnitude_db(20.0, SR) - 6.0).abs() < 0.2);
        assert!(coeffs.magnitude_db(15000.0, SR).abs() < 0.2);
    }

    #[test]
    fn test_high_shelf_response() {
        let coeffs = BiquadCoeffs::high_shelf(SR, 4000.0, -6.0);
        assert!((coeffs.magnitude_db(20000.0, SR) + 6.0).abs() < 0.3);
        assert!(coeffs.magnitude_db(50.0, SR).abs() < 0.2);
    }

    #[test]
    fn test_low_shelf_boosts_low_sine() {
        let coeffs = BiquadCoeffs::low_shelf(SR, 200.0, 6.0);
        let mut state = BiquadState::default();

        let mut signal = sine(4800, 50.0);
        state.process_buffer(&coeffs, &mut signal);

        // Skip the transient, compare settled peak against +6 dB
        let peak = signal[2400..].iter().map(|s| s.abs()).fold(0.0_f32, f32::max);
        assert!(peak > 1.8 && peak < 2.1, "peak = {peak}");
    }

    #[test]
    fn test_state_carries_across_buffers() {
        let coeffs = BiquadCoeffs::peaking(SR, 1000.0, 9.0, 2.0);
        let input = sine(512, 900.0);

        let mut whole = input.clone();
        BiquadState::default().process_buffer(&coeffs, &mut whole);

        let mut state = BiquadState::default();
        let mut split = input.clone();
        let (first, second) = split.split_at_mut(200);
        state.process_buffer(&coeffs, first);
        state.process_buffer(&coeffs, second);

        assert_eq!(whole, split);
    }

    #[test]
    fn test_biquad_reset() {
        let coeffs = BiquadCoeffs::low_shelf(SR, 200.0, 6.0);
        let mut state = BiquadState::default();

        let mut buffer = vec![0.5; 100];
        state.process_buffer(&coeffs, &mut buffer);

        state.reset();
        let mut silence = vec![0.0; 10];
        state.process_buffer(&coeffs, &mut silence);

        assert!(silence.iter().all(|&s| s == 0.0));
    }
}
