//! Digital Signal Processing stages for the effects chain
//!
//! This module provides every stage the chain is built from:
//! - Biquad coefficient calculator and Direct Form I filter state
//! - 3-band Equalizer (low shelf, peaking, high shelf)
//! - Feed-forward stereo-linked Compressor
//! - Peak Limiter (always the last stage)
//! - Schroeder Reverb (parallel combs, series allpasses)
//!
//! All stages are designed for:
//! - Zero allocations in the hot path (delay lines are sized once, at construction)
//! - Stereo-linked processing, one frame at a time
//! - State that persists across blocks until an explicit reset

pub mod biquad;
pub mod compressor;
pub mod equalizer;
pub mod limiter;
pub mod reverb;

pub use biquad::{BiquadCoeffs, BiquadState, FilterShape};
pub use compressor::{Compressor, CompressorParams};
pub use equalizer::{EqBand, Equalizer, EqualizerParams};
pub use limiter::{Limiter, LimiterParams};
pub use reverb::{Reverb, ReverbParams};

/// Core trait for every stage of the chain
///
/// Stages process one stereo frame at a time. The pipeline holds concrete
/// stages and calls them statically; the trait only fixes the shape they share.
pub trait StereoProcessor {
    /// Process a single stereo frame
    fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32);

    /// Clear per-sample history (filter state, envelopes, delay lines)
    ///
    /// Configuration is kept and nothing is reallocated.
    fn reset(&mut self);

    /// Get stage name for debugging/display
    fn name(&self) -> &str;

    /// Process an interleaved stereo buffer in-place
    ///
    /// Only whole frames are processed; a trailing unpaired sample is left
    /// untouched. [`Pipeline::process_interleaved`] rejects odd lengths up front.
    ///
    /// [`Pipeline::process_interleaved`]: crate::domain::pipeline::Pipeline::process_interleaved
    fn process_interleaved(&mut self, buffer: &mut [f32]) {
        for frame in buffer.chunks_exact_mut(2) {
            let (l, r) = self.process_frame(frame[0], frame[1]);
            frame[0] = l;
            frame[1] = r;
        }
    }
}

/// One-pole smoothing coefficient for a time constant
///
/// Returns `1 - exp(-1 / (tau * sample_rate))`, the fraction of the remaining
/// distance covered per sample.
#[inline]
pub fn one_pole_coeff(tau_sec: f32, sample_rate: f32) -> f32 {
    1.0 - (-1.0 / (tau_sec * sample_rate)).exp()
}

/// Parameter constraints applied by the control-message handlers
///
/// Stages themselves do not clamp; the handlers do, so every value that
/// reaches coefficient math is in range.
pub mod params {
    /// EQ band gain range (dB)
    pub const EQ_GAIN_MIN: f32 = -24.0;
    pub const EQ_GAIN_MAX: f32 = 24.0;

    /// EQ corner/center frequency ranges (Hz)
    pub const LOW_FREQ_MIN: f32 = 20.0;
    pub const LOW_FREQ_MAX: f32 = 500.0;
    pub const MID_FREQ_MIN: f32 = 200.0;
    pub const MID_FREQ_MAX: f32 = 8000.0;
    pub const HIGH_FREQ_MIN: f32 = 2000.0;
    pub const HIGH_FREQ_MAX: f32 = 20000.0;

    /// Upper frequency bound as a fraction of the sample rate
    pub const NYQUIST_FRACTION: f32 = 0.49;

    /// Mid band Q range
    pub const Q_MIN: f32 = 0.1;
    pub const Q_MAX: f32 = 10.0;

    /// Compressor threshold range (dB)
    pub const COMP_THRESHOLD_MIN: f32 = -60.0;
    pub const COMP_THRESHOLD_MAX: f32 = 0.0;

    /// Compressor ratio range (1:1 to 20:1)
    pub const RATIO_MIN: f32 = 1.0;
    pub const RATIO_MAX: f32 = 20.0;

    /// Attack/Release time ranges in milliseconds
    pub const ATTACK_MS_MIN: f32 = 0.01;
    pub const ATTACK_MS_MAX: f32 = 1000.0;
    pub const RELEASE_MS_MIN: f32 = 1.0;
    pub const RELEASE_MS_MAX: f32 = 5000.0;

    /// Compressor makeup gain range (dB)
    pub const MAKEUP_MIN: f32 = 0.0;
    pub const MAKEUP_MAX: f32 = 24.0;

    /// Limiter threshold range (dB)
    pub const LIMIT_THRESHOLD_MIN: f32 = -12.0;
    pub const LIMIT_THRESHOLD_MAX: f32 = 0.0;

    /// Reverb comb feedback range
    pub const FEEDBACK_MIN: f32 = 0.0;
    pub const FEEDBACK_MAX: f32 = 0.98;

    /// Clamp a frequency into `[min, max]`, never above the Nyquist guard
    ///
    /// The lower bound yields to the Nyquist guard at very low sample rates.
    pub fn clamp_frequency(freq: f32, min: f32, max: f32, sample_rate: Option<f32>) -> f32 {
        let max = match sample_rate {
            Some(sr) => max.min(sr * NYQUIST_FRACTION),
            None => max,
        };
        let min = min.min(max);
        freq.clamp(min, max)
    }
}
