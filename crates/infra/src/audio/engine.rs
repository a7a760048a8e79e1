//! Render-thread engine
//!
//! `RealtimeEngine` owns the pipeline and the receiving end of the control
//! channel. Each block call first applies every pending message, then
//! renders, so a message always lands between two blocks.

use cadence_core::domain::audio::Result;
use cadence_core::domain::pipeline::Pipeline;
use tracing::{info, warn};

use super::control_queue::ControlReceiver;

/// Pipeline driver for the real-time thread
pub struct RealtimeEngine {
    pipeline: Pipeline,
    control: ControlReceiver,
    blocks_processed: u64,
    rejected_messages: u64,
}

impl RealtimeEngine {
    /// Create an engine around an uninitialized pipeline
    pub fn new(control: ControlReceiver) -> Self {
        Self::with_pipeline(Pipeline::new(), control)
    }

    pub fn with_pipeline(pipeline: Pipeline, control: ControlReceiver) -> Self {
        Self {
            pipeline,
            control,
            blocks_processed: 0,
            rejected_messages: 0,
        }
    }

    /// Apply every pending control message; returns how many were taken
    pub fn drain_messages(&mut self) -> usize {
        let mut applied = 0;
        while let Some(message) = self.control.try_recv() {
            match self.pipeline.apply(message) {
                Ok(Some(event)) => self.control.publish(event),
                Ok(None) => {}
                Err(e) => {
                    self.rejected_messages += 1;
                    warn!(?message, error = %e, "Control message rejected");
                }
            }
            applied += 1;
        }
        applied
    }

    /// Drain messages, then render one planar block
    pub fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        self.drain_messages();
        self.pipeline.process_block(inputs, outputs);
        self.blocks_processed += 1;
    }

    /// Drain messages, then render one interleaved stereo block in place
    pub fn process_interleaved(&mut self, buffer: &mut [f32]) -> Result<()> {
        self.drain_messages();
        self.pipeline.process_interleaved(buffer)?;
        self.blocks_processed += 1;
        Ok(())
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn blocks_processed(&self) -> u64 {
        self.blocks_processed
    }

    /// Messages the pipeline refused (e.g. `init` with a bad sample rate)
    pub fn rejected_messages(&self) -> u64 {
        self.rejected_messages
    }
}

impl Drop for RealtimeEngine {
    fn drop(&mut self) {
        info!(
            blocks = self.blocks_processed,
            rejected = self.rejected_messages,
            "Shutting down realtime engine"
        );
    }
}
