//! Peak limiter
//!
//! Always the final stage. Attack is instantaneous: the envelope jumps to the
//! reduction the current sample needs, then decays exponentially.
//! There is no lookahead, so the sample that triggers the limiter may
//! overshoot the ceiling by `(peak - ceiling) * release_coeff`.

use super::{one_pole_coeff, StereoProcessor};
use crate::domain::audio::{db_to_gain, gain_to_db};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Peak limiter with instant attack and exponential release
#[derive(Debug, Clone)]
pub struct Limiter {
    threshold_db: f32,
    threshold_linear: f32,
    release_coeff: f32,
    // Linear reduction amount in 0..1; gain is `1 - envelope`
    envelope: f32,
}

impl Limiter {
    /// Default ceiling (dB)
    pub const DEFAULT_THRESHOLD_DB: f32 = -0.1;
    /// Default release time (seconds)
    pub const DEFAULT_RELEASE_SEC: f32 = 0.05;

    pub fn new(sample_rate: f32) -> Self {
        Self::with_params(sample_rate, LimiterParams::default())
    }

    pub fn with_params(sample_rate: f32, params: LimiterParams) -> Self {
        Self {
            threshold_db: params.threshold_db,
            threshold_linear: db_to_gain(params.threshold_db),
            release_coeff: one_pole_coeff(Self::DEFAULT_RELEASE_SEC, sample_rate),
            envelope: 0.0,
        }
    }

    /// Set the ceiling in dB
    pub fn set_threshold(&mut self, threshold_db: f32) {
        self.threshold_db = threshold_db;
        self.threshold_linear = db_to_gain(threshold_db);
        trace!(threshold_db, "Limiter updated");
    }

    pub fn threshold_linear(&self) -> f32 {
        self.threshold_linear
    }

    pub fn release_coeff(&self) -> f32 {
        self.release_coeff
    }

    /// Current gain reduction in dB (positive = reducing)
    pub fn gain_reduction_db(&self) -> f32 {
        -gain_to_db(1.0 - self.envelope)
    }

    pub fn params(&self) -> LimiterParams {
        LimiterParams {
            threshold_db: self.threshold_db,
        }
    }
}

impl StereoProcessor for Limiter {
    #[inline]
    fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        let peak = left.abs().max(right.abs());
        if peak > self.threshold_linear {
            let needed = 1.0 - self.threshold_linear / peak;
            self.envelope = self.envelope.max(needed);
        }
        self.envelope *= 1.0 - self.release_coeff;

        let gain = 1.0 - self.envelope;
        (left * gain, right * gain)
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
    }

    fn name(&self) -> &str {
        "Limiter"
    }
}

/// Limiter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterParams {
    pub threshold_db: f32,
}

impl Default for LimiterParams {
    fn default() -> Self {
        Self {
            threshold_db: Limiter::DEFAULT_THRESHOLD_DB,
        }
    }
}

impl LimiterParams {
    pub fn clamped(self) -> Self {
        use super::params::*;
        Self {
            threshold_db: self.threshold_db.clamp(LIMIT_THRESHOLD_MIN, LIMIT_THRESHOLD_MAX),
        }
    }
}
