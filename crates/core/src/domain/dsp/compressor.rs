//! Feed-forward compressor
//!
//! Stereo-linked peak detection: the louder channel drives one shared gain,
//! so the stereo image never shifts under compression.

use super::{one_pole_coeff, StereoProcessor};
use crate::domain::audio::{db_to_gain, gain_to_db};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Dynamic range compressor
///
/// The envelope tracks gain reduction in dB (not signal level), smoothed with
/// separate attack and release time constants. There is no knee and no
/// lookahead.
#[derive(Debug, Clone)]
pub struct Compressor {
    sample_rate: f32,
    // Parameters
    threshold_db: f32,
    ratio: f32,
    attack_sec: f32,
    release_sec: f32,
    makeup_gain_db: f32,
    // Coefficients (pre-computed per parameter change)
    attack_coeff: f32,
    release_coeff: f32,
    makeup_gain: f32,
    // Gain reduction envelope in dB, shared by both channels
    envelope_db: f32,
}

impl Compressor {
    pub const DEFAULT_THRESHOLD_DB: f32 = -24.0;
    pub const DEFAULT_RATIO: f32 = 4.0;
    pub const DEFAULT_ATTACK_MS: f32 = 5.0;
    pub const DEFAULT_RELEASE_MS: f32 = 100.0;

    /// Create a compressor with default parameters (-24 dB, 4:1, 5 ms, 100 ms)
    pub fn new(sample_rate: f32) -> Self {
        Self::with_params(sample_rate, CompressorParams::default())
    }

    pub fn with_params(sample_rate: f32, params: CompressorParams) -> Self {
        let mut comp = Self {
            sample_rate,
            threshold_db: params.threshold_db,
            ratio: params.ratio,
            attack_sec: params.attack_ms / 1000.0,
            release_sec: params.release_ms / 1000.0,
            makeup_gain_db: params.makeup_gain_db,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            makeup_gain: 1.0,
            envelope_db: 0.0,
        };
        comp.update_coefficients();
        comp
    }

    /// Set all parameters at once; the envelope is kept
    pub fn set_params(&mut self, params: CompressorParams) {
        self.threshold_db = params.threshold_db;
        self.ratio = params.ratio;
        self.attack_sec = params.attack_ms / 1000.0;
        self.release_sec = params.release_ms / 1000.0;
        self.makeup_gain_db = params.makeup_gain_db;
        self.update_coefficients();
        trace!(
            threshold_db = self.threshold_db,
            ratio = self.ratio,
            attack_ms = params.attack_ms,
            release_ms = params.release_ms,
            "Compressor updated"
        );
    }

    /// Set the threshold in dB
    pub fn set_threshold(&mut self, threshold_db: f32) {
        self.threshold_db = threshold_db;
    }

    /// Set attack and release times in milliseconds
    pub fn set_times(&mut self, attack_ms: f32, release_ms: f32) {
        self.attack_sec = attack_ms / 1000.0;
        self.release_sec = release_ms / 1000.0;
        self.update_coefficients();
    }

    /// Set the make-up gain in dB
    pub fn set_makeup_gain(&mut self, gain_db: f32) {
        self.makeup_gain_db = gain_db;
        self.makeup_gain = db_to_gain(gain_db);
    }

    fn update_coefficients(&mut self) {
        self.attack_coeff = one_pole_coeff(self.attack_sec, self.sample_rate);
        self.release_coeff = one_pole_coeff(self.release_sec, self.sample_rate);
        self.makeup_gain = db_to_gain(self.makeup_gain_db);
    }

    /// Static gain computer: dB of reduction wanted for a detected level
    #[inline]
    fn target_reduction_db(&self, level_db: f32) -> f32 {
        let excess = (level_db - self.threshold_db).max(0.0);
        excess - excess / self.ratio
    }

    /// Current gain reduction in dB (positive = reducing)
    pub fn gain_reduction_db(&self) -> f32 {
        self.envelope_db
    }

    /// Get current parameter values
    pub fn params(&self) -> CompressorParams {
        CompressorParams {
            threshold_db: self.threshold_db,
            ratio: self.ratio,
            attack_ms: self.attack_sec * 1000.0,
            release_ms: self.release_sec * 1000.0,
            makeup_gain_db: self.makeup_gain_db,
        }
    }
}

impl StereoProcessor for Compressor {
    #[inline]
    fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        let peak = left.abs().max(right.abs());
        let target = self.target_reduction_db(gain_to_db(peak));

        let coeff = if target > self.envelope_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope_db += coeff * (target - self.envelope_db);

        let gain = db_to_gain(-self.envelope_db) * self.makeup_gain;
        (left * gain, right * gain)
    }

    fn reset(&mut self) {
        self.envelope_db = 0.0;
    }

    fn name(&self) -> &str {
        "Compressor"
    }
}

/// Compressor parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorParams {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub makeup_gain_db: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: Compressor::DEFAULT_THRESHOLD_DB,
            ratio: Compressor::DEFAULT_RATIO,
            attack_ms: Compressor::DEFAULT_ATTACK_MS,
            release_ms: Compressor::DEFAULT_RELEASE_MS,
            makeup_gain_db: 0.0,
        }
    }
}

impl CompressorParams {
    /// Bring every field into its allowed range
    pub fn clamped(self) -> Self {
        use super::params::*;
        Self {
            threshold_db: self.threshold_db.clamp(COMP_THRESHOLD_MIN, COMP_THRESHOLD_MAX),
            ratio: self.ratio.clamp(RATIO_MIN, RATIO_MAX),
            attack_ms: self.attack_ms.clamp(ATTACK_MS_MIN, ATTACK_MS_MAX),
            release_ms: self.release_ms.clamp(RELEASE_MS_MIN, RELEASE_MS_MAX),
            makeup_gain_db: self.makeup_gain_db.clamp(MAKEUP_MIN, MAKEUP_MAX),
        }
    }
}
