//! Cadence infrastructure: real-time plumbing around the core pipeline
//!
//! - `audio`: lock-free control channel and the render-thread engine
//! - `analysis`: FFT helpers for inspecting rendered output

pub mod analysis;
pub mod audio;

pub use audio::{control_channel, ControlReceiver, ControlSender, RealtimeEngine};
