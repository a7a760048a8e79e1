//! Effects chain orchestrator
//!
//! Owns one instance of every stage and runs them in a fixed order per frame:
//! EQ -> Compressor -> Reverb -> Limiter. The compressor sits before the reverb
//! so the tail is not pumped, and the limiter sees the true output.
//!
//! Until an `init` message supplies the sample rate the pipeline is a pure
//! passthrough and no coefficient is ever computed.

use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use super::audio::{AudioError, Result};
use super::control::{ControlEvent, ControlMessage};
use super::dsp::{
    Compressor, CompressorParams, Equalizer, EqualizerParams, Limiter, LimiterParams, Reverb,
    ReverbParams, StereoProcessor,
};

/// Lifecycle of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No sample rate yet; blocks are copied through untouched
    Uninitialized,
    /// Stages allocated; blocks run through the chain
    Active,
}

/// Snapshot of every stage's configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    pub eq: EqualizerParams,
    pub compressor: CompressorParams,
    pub limiter: LimiterParams,
    pub reverb: ReverbParams,
}

impl ChainSettings {
    /// Ordered message sequence that brings a fresh pipeline to these settings
    ///
    /// `init` comes first so every later message lands on live stages.
    pub fn to_messages(&self, sample_rate: f32) -> Vec<ControlMessage> {
        let eq = &self.eq;
        let comp = &self.compressor;
        vec![
            ControlMessage::Init { sample_rate },
            ControlMessage::SetEqFrequencies {
                low_freq: eq.low_freq,
                mid_freq: eq.mid_freq,
                high_freq: eq.high_freq,
                mid_q: eq.mid_q,
            },
            ControlMessage::SetEq {
                low_gain_db: eq.low_gain_db,
                mid_gain_db: eq.mid_gain_db,
                high_gain_db: eq.high_gain_db,
            },
            ControlMessage::SetCompressor {
                threshold_db: comp.threshold_db,
                ratio: comp.ratio,
                attack_ms: comp.attack_ms,
                release_ms: comp.release_ms,
            },
            ControlMessage::SetCompressorMakeup {
                gain_db: comp.makeup_gain_db,
            },
            ControlMessage::SetLimiter {
                threshold_db: self.limiter.threshold_db,
            },
            ControlMessage::SetReverbFeedback {
                feedback: self.reverb.feedback,
            },
            ControlMessage::SetReverb {
                mix: self.reverb.mix,
            },
        ]
    }

    /// Bring every stage's settings into range
    pub fn clamped(self, sample_rate: Option<f32>) -> Self {
        Self {
            eq: self.eq.clamped(sample_rate),
            compressor: self.compressor.clamped(),
            limiter: self.limiter.clamped(),
            reverb: self.reverb.clamped(),
        }
    }
}

/// Concrete stages, present only once the sample rate is known
#[derive(Debug, Clone)]
struct ChainStages {
    sample_rate: f32,
    eq: Equalizer,
    compressor: Compressor,
    reverb: Reverb,
    limiter: Limiter,
}

impl ChainStages {
    /// Build every stage; EQ frequencies are limited below Nyquist for this rate
    fn new(sample_rate: f32, settings: &ChainSettings) -> Self {
        let settings = settings.clamped(Some(sample_rate));
        Self {
            sample_rate,
            eq: Equalizer::with_params(sample_rate, settings.eq),
            compressor: Compressor::with_params(sample_rate, settings.compressor),
            reverb: Reverb::with_params(sample_rate, settings.reverb),
            limiter: Limiter::with_params(sample_rate, settings.limiter),
        }
    }

    #[inline]
    fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        let (l, r) = self.eq.process_frame(left, right);
        let (l, r) = self.compressor.process_frame(l, r);
        let (l, r) = self.reverb.process_frame(l, r);
        self.limiter.process_frame(l, r)
    }

    fn reset(&mut self) {
        self.eq.reset();
        self.compressor.reset();
        self.reverb.reset();
        self.limiter.reset();
    }
}

/// The effects chain and its message-driven configuration surface
///
/// Messages and blocks must be serialized by the caller: a message applies
/// fully between two blocks.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    settings: ChainSettings,
    stages: Option<ChainStages>,
}

impl Pipeline {
    /// Create an uninitialized pipeline with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PipelineState {
        match self.stages {
            Some(_) => PipelineState::Active,
            None => PipelineState::Uninitialized,
        }
    }

    /// Sample rate given to the last successful `init`
    pub fn sample_rate(&self) -> Option<f32> {
        self.stages.as_ref().map(|s| s.sample_rate)
    }

    /// Requested configuration of every stage, clamped to its allowed range
    ///
    /// EQ frequencies are kept as requested; the stages additionally hold them
    /// below Nyquist for the current sample rate.
    pub fn settings(&self) -> &ChainSettings {
        &self.settings
    }

    /// Apply one control message
    ///
    /// Values are clamped into range before they reach a stage. Before `init`
    /// the settings are stored and take effect when the stages are built.
    /// Returns `Ready` after a successful `init`.
    pub fn apply(&mut self, message: ControlMessage) -> Result<Option<ControlEvent>> {
        let sample_rate = self.sample_rate();
        match message {
            ControlMessage::Init { sample_rate } => return self.init(sample_rate).map(Some),
            ControlMessage::SetEq {
                low_gain_db,
                mid_gain_db,
                high_gain_db,
            } => {
                let eq = EqualizerParams {
                    low_gain_db,
                    mid_gain_db,
                    high_gain_db,
                    ..self.settings.eq
                }
                .clamped(None);
                self.settings.eq = eq;
                if let Some(stages) = &mut self.stages {
                    stages
                        .eq
                        .set_gains(eq.low_gain_db, eq.mid_gain_db, eq.high_gain_db);
                }
            }
            ControlMessage::SetEqFrequencies {
                low_freq,
                mid_freq,
                high_freq,
                mid_q,
            } => {
                let eq = EqualizerParams {
                    low_freq,
                    mid_freq,
                    high_freq,
                    mid_q,
                    ..self.settings.eq
                }
                .clamped(None);
                self.settings.eq = eq;
                if let Some(stages) = &mut self.stages {
                    let live = eq.clamped(sample_rate);
                    stages
                        .eq
                        .set_frequencies(live.low_freq, live.mid_freq, live.high_freq, live.mid_q);
                }
            }
            ControlMessage::SetCompressor {
                threshold_db,
                ratio,
                attack_ms,
                release_ms,
            } => {
                let compressor = CompressorParams {
                    threshold_db,
                    ratio,
                    attack_ms,
                    release_ms,
                    ..self.settings.compressor
                }
                .clamped();
                self.settings.compressor = compressor;
                if let Some(stages) = &mut self.stages {
                    stages.compressor.set_params(compressor);
                }
            }
            ControlMessage::SetCompressorMakeup { gain_db } => {
                let compressor = CompressorParams {
                    makeup_gain_db: gain_db,
                    ..self.settings.compressor
                }
                .clamped();
                self.settings.compressor = compressor;
                if let Some(stages) = &mut self.stages {
                    stages.compressor.set_makeup_gain(compressor.makeup_gain_db);
                }
            }
            ControlMessage::SetLimiter { threshold_db } => {
                let limiter = LimiterParams { threshold_db }.clamped();
                self.settings.limiter = limiter;
                if let Some(stages) = &mut self.stages {
                    stages.limiter.set_threshold(limiter.threshold_db);
                }
            }
            ControlMessage::SetReverb { mix } => {
                let reverb = ReverbParams {
                    mix,
                    ..self.settings.reverb
                }
                .clamped();
                self.settings.reverb = reverb;
                if let Some(stages) = &mut self.stages {
                    stages.reverb.set_mix(reverb.mix);
                }
            }
            ControlMessage::SetReverbFeedback { feedback } => {
                let reverb = ReverbParams {
                    feedback,
                    ..self.settings.reverb
                }
                .clamped();
                self.settings.reverb = reverb;
                if let Some(stages) = &mut self.stages {
                    stages.reverb.set_feedback(reverb.feedback);
                }
            }
            ControlMessage::Reset => match &mut self.stages {
                Some(stages) => stages.reset(),
                None => warn!("Reset before init ignored"),
            },
        }
        trace!(?message, state = ?self.state(), "Control message applied");
        Ok(None)
    }

    /// Allocate every stage for `sample_rate`, discarding previous history
    fn init(&mut self, sample_rate: f32) -> Result<ControlEvent> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(AudioError::InvalidSampleRate(sample_rate));
        }

        self.stages = Some(ChainStages::new(sample_rate, &self.settings));

        info!(sample_rate, "Pipeline initialized");
        Ok(ControlEvent::Ready { sample_rate })
    }

    /// Run a single stereo frame through the chain
    #[inline]
    pub fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        match &mut self.stages {
            Some(stages) => stages.process_frame(left, right),
            None => (left, right),
        }
    }

    /// Process one planar block
    ///
    /// A single input channel is used for both lanes. A single output channel
    /// receives the mid signal `(l + r) / 2`. Empty `inputs` is a no-op.
    /// The channel layout means the same before and after `init`; only the
    /// chain in between is skipped while uninitialized. Frames beyond the
    /// shortest given channel, and output channels past the second, are left
    /// untouched.
    pub fn process_block(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let Some(&left_in) = inputs.first() else {
            return;
        };
        let right_in = inputs.get(1).copied().unwrap_or(left_in);

        let frames = left_in.len().min(right_in.len());
        match outputs {
            [] => {}
            [mono] => {
                let frames = frames.min(mono.len());
                for i in 0..frames {
                    let (l, r) = self.process_frame(left_in[i], right_in[i]);
                    mono[i] = (l + r) * 0.5;
                }
            }
            [out_left, out_right, ..] => {
                let frames = frames.min(out_left.len()).min(out_right.len());
                for i in 0..frames {
                    let (l, r) = self.process_frame(left_in[i], right_in[i]);
                    out_left[i] = l;
                    out_right[i] = r;
                }
            }
        }
    }

    /// Process an interleaved stereo buffer in place
    pub fn process_interleaved(&mut self, buffer: &mut [f32]) -> Result<()> {
        if buffer.len() % 2 != 0 {
            return Err(AudioError::OddInterleavedLength(buffer.len()));
        }
        if let Some(stages) = &mut self.stages {
            for frame in buffer.chunks_exact_mut(2) {
                let (l, r) = stages.process_frame(frame[0], frame[1]);
                frame[0] = l;
                frame[1] = r;
            }
        }
        Ok(())
    }

    /// Compressor gain reduction in dB (0 before `init`)
    pub fn compressor_gain_reduction_db(&self) -> f32 {
        self.stages
            .as_ref()
            .map_or(0.0, |s| s.compressor.gain_reduction_db())
    }

    /// Limiter gain reduction in dB (0 before `init`)
    pub fn limiter_gain_reduction_db(&self) -> f32 {
        self.stages
            .as_ref()
            .map_or(0.0, |s| s.limiter.gain_reduction_db())
    }

    /// Whether the reverb stage is currently running
    pub fn reverb_enabled(&self) -> bool {
        self.stages.as_ref().is_some_and(|s| s.reverb.is_enabled())
    }
}
