//! Processing-surface errors and level conversions
//!
//! The per-sample hot path never fails. Errors here surface only at the edges:
//! pipeline initialization and the block layouts a host hands in.

use thiserror::Error;

/// Errors that can occur at the processing surface
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioError {
    /// Sample rate given to `init` is not a positive, finite number
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f32),

    /// Interleaved stereo buffer has an odd number of samples
    #[error("Interleaved stereo buffer has odd length {0}")]
    OddInterleavedLength(usize),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Level floor used wherever `log10(0)` would otherwise be taken
pub const DB_FLOOR: f32 = -120.0;

/// Convert decibels to a linear amplitude factor
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert a linear amplitude to decibels, floored at [`DB_FLOOR`]
#[inline]
pub fn gain_to_db(gain: f32) -> f32 {
    if gain > 0.0 {
        20.0 * gain.log10()
    } else {
        DB_FLOOR
    }
}

/// Absolute peak of a buffer
pub fn peak_level(buffer: &[f32]) -> f32 {
    buffer.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}
