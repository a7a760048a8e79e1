//! Cadence core: the real-time effects chain
//!
//! Pure domain code. Nothing here spawns threads or touches devices; the
//! render loop and the control queue live in `cadence-infra`.

pub mod domain;

pub use domain::{
    AudioError, ChainSettings, ControlError, ControlEvent, ControlMessage, EngineConfig, Pipeline,
    PipelineState,
};
