//! Render-thread side of the engine
//!
//! The control thread talks to the render thread only through the lock-free
//! control channel; the render thread owns the pipeline outright.

pub mod control_queue;
pub mod engine;

pub use control_queue::{control_channel, ControlReceiver, ControlSender};
pub use engine::RealtimeEngine;
