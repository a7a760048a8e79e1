//! Domain entities and processing rules

pub mod audio;
pub mod config;
pub mod control;
pub mod dsp;
pub mod pipeline;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{db_to_gain, gain_to_db, peak_level, AudioError, DB_FLOOR};
pub use config::{ConfigError, EngineConfig};
pub use control::{ControlError, ControlEvent, ControlMessage};
pub use dsp::{
    BiquadCoeffs, BiquadState, Compressor, CompressorParams, EqBand, Equalizer, EqualizerParams,
    FilterShape, Limiter, LimiterParams, Reverb, ReverbParams, StereoProcessor,
};
pub use pipeline::{ChainSettings, Pipeline, PipelineState};
