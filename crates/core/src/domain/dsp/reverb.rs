//! Schroeder reverb
//!
//! Six parallel feedback combs summed and averaged, then four allpasses in
//! series. Delay lengths are tuned at 48 kHz and scaled to the running rate.
//! Every line is allocated once, at construction.

use super::StereoProcessor;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Comb delay lengths in samples at [`REFERENCE_RATE`]
pub const COMB_TUNING: [usize; 6] = [1557, 1617, 1491, 1422, 1277, 1356];
/// Allpass delay lengths in samples at [`REFERENCE_RATE`]
pub const ALLPASS_TUNING: [usize; 4] = [225, 556, 441, 341];
/// Rate the tunings were chosen at
pub const REFERENCE_RATE: f32 = 48000.0;

/// Extra attenuation on the wet path
const WET_GAIN: f32 = 0.5;
/// Mix at or below this leaves the stage bypassed
const ENABLE_THRESHOLD: f32 = 0.001;
const ALLPASS_FEEDBACK: f32 = 0.5;

/// Scale a 48 kHz tuning to `sample_rate`, flooring to whole samples
fn scale_to_rate(samples: usize, sample_rate: f32) -> usize {
    ((samples as f64 * f64::from(sample_rate) / f64::from(REFERENCE_RATE)) as usize).max(1)
}

/// Circular buffer pair with one write cursor for both channels
#[derive(Debug, Clone)]
struct StereoDelayLine {
    left: Vec<f32>,
    right: Vec<f32>,
    pos: usize,
}

impl StereoDelayLine {
    fn new(len: usize) -> Self {
        Self {
            left: vec![0.0; len],
            right: vec![0.0; len],
            pos: 0,
        }
    }

    fn len(&self) -> usize {
        self.left.len()
    }

    #[inline]
    fn advance(&mut self) {
        self.pos = (self.pos + 1) % self.left.len();
    }

    /// Feedback comb: returns the delayed frame, stores `input + delayed * feedback`
    #[inline]
    fn comb(&mut self, left: f32, right: f32, feedback: f32) -> (f32, f32) {
        let delayed_l = self.left[self.pos];
        let delayed_r = self.right[self.pos];
        self.left[self.pos] = left + delayed_l * feedback;
        self.right[self.pos] = right + delayed_r * feedback;
        self.advance();
        (delayed_l, delayed_r)
    }

    /// Allpass step; the raw input is what goes into the line
    #[inline]
    fn allpass(&mut self, left: f32, right: f32, feedback: f32) -> (f32, f32) {
        let delayed_l = self.left[self.pos];
        let delayed_r = self.right[self.pos];
        let new_l = left + delayed_l * feedback;
        let new_r = right + delayed_r * feedback;
        self.left[self.pos] = left;
        self.right[self.pos] = right;
        self.advance();
        (delayed_l - new_l * feedback, delayed_r - new_r * feedback)
    }

    fn clear(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
        self.pos = 0;
    }
}

/// Stereo Schroeder reverb with dry/wet mix
///
/// While bypassed (mix <= 0.001) the delay lines are frozen: nothing is read,
/// written, or advanced, so a tail resumes where it stopped when re-enabled.
#[derive(Debug, Clone)]
pub struct Reverb {
    combs: Vec<StereoDelayLine>,
    allpasses: Vec<StereoDelayLine>,
    comb_feedback: f32,
    mix: f32,
    enabled: bool,
}

impl Reverb {
    pub const DEFAULT_FEEDBACK: f32 = 0.84;

    /// Create a bypassed reverb with lines sized for `sample_rate`
    pub fn new(sample_rate: f32) -> Self {
        Self::with_params(sample_rate, ReverbParams::default())
    }

    pub fn with_params(sample_rate: f32, params: ReverbParams) -> Self {
        let combs = COMB_TUNING
            .iter()
            .map(|&n| StereoDelayLine::new(scale_to_rate(n, sample_rate)))
            .collect();
        let allpasses = ALLPASS_TUNING
            .iter()
            .map(|&n| StereoDelayLine::new(scale_to_rate(n, sample_rate)))
            .collect();

        let mut reverb = Self {
            combs,
            allpasses,
            comb_feedback: params.feedback,
            mix: 0.0,
            enabled: false,
        };
        reverb.set_mix(params.mix);
        reverb
    }

    /// Set the dry/wet mix; enables the stage when above the bypass threshold
    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix;
        self.enabled = mix > ENABLE_THRESHOLD;
        trace!(mix, enabled = self.enabled, "Reverb updated");
    }

    /// Set the comb feedback (decay length)
    pub fn set_feedback(&mut self, feedback: f32) {
        self.comb_feedback = feedback;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Comb line lengths in samples
    pub fn comb_lengths(&self) -> Vec<usize> {
        self.combs.iter().map(StereoDelayLine::len).collect()
    }

    /// Allpass line lengths in samples
    pub fn allpass_lengths(&self) -> Vec<usize> {
        self.allpasses.iter().map(StereoDelayLine::len).collect()
    }

    #[inline]
    fn wet(&mut self, left: f32, right: f32) -> (f32, f32) {
        let mut sum_l = 0.0;
        let mut sum_r = 0.0;
        for comb in &mut self.combs {
            let (l, r) = comb.comb(left, right, self.comb_feedback);
            sum_l += l;
            sum_r += r;
        }
        let scale = 1.0 / self.combs.len() as f32;
        let mut l = sum_l * scale;
        let mut r = sum_r * scale;

        for allpass in &mut self.allpasses {
            (l, r) = allpass.allpass(l, r, ALLPASS_FEEDBACK);
        }
        (l, r)
    }
}

impl StereoProcessor for Reverb {
    #[inline]
    fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        if !self.enabled {
            return (left, right);
        }

        let (wet_l, wet_r) = self.wet(left, right);
        let dry = 1.0 - self.mix;
        let wet = self.mix * WET_GAIN;
        (left * dry + wet_l * wet, right * dry + wet_r * wet)
    }

    fn reset(&mut self) {
        for line in self.combs.iter_mut().chain(self.allpasses.iter_mut()) {
            line.clear();
        }
    }

    fn name(&self) -> &str {
        "Reverb"
    }
}

/// Reverb parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbParams {
    pub mix: f32,
    pub feedback: f32,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            mix: 0.0,
            feedback: Reverb::DEFAULT_FEEDBACK,
        }
    }
}

impl ReverbParams {
    pub fn clamped(self) -> Self {
        use super::params::*;
        Self {
            mix: self.mix.clamp(0.0, 1.0),
            feedback: self.feedback.clamp(FEEDBACK_MIN, FEEDBACK_MAX),
        }
    }
}
