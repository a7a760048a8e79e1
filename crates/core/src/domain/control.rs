//! Control-channel vocabulary
//!
//! Messages reconfigure the chain between blocks; events flow back to the
//! control side. Both serialize as JSON objects tagged by `type`, e.g.
//! `{"type":"setEq","lowGainDb":3.0}`. Absent fields take their defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::dsp::{Compressor, Equalizer, Limiter, Reverb};

/// Errors on the control channel
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Malformed control message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Queue toward the render thread is full; the message is handed back
    #[error("Control queue full, dropped {0:?}")]
    QueueFull(ControlMessage),
}

pub type Result<T> = std::result::Result<T, ControlError>;

/// Reconfiguration command for the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ControlMessage {
    /// Allocate the stages for a sample rate and start processing
    Init {
        #[serde(default = "defaults::sample_rate")]
        sample_rate: f32,
    },
    SetEq {
        #[serde(default)]
        low_gain_db: f32,
        #[serde(default)]
        mid_gain_db: f32,
        #[serde(default)]
        high_gain_db: f32,
    },
    SetEqFrequencies {
        #[serde(default = "defaults::low_freq")]
        low_freq: f32,
        #[serde(default = "defaults::mid_freq")]
        mid_freq: f32,
        #[serde(default = "defaults::high_freq")]
        high_freq: f32,
        #[serde(default = "defaults::mid_q")]
        mid_q: f32,
    },
    SetCompressor {
        #[serde(default = "defaults::comp_threshold_db")]
        threshold_db: f32,
        #[serde(default = "defaults::ratio")]
        ratio: f32,
        #[serde(default = "defaults::attack_ms")]
        attack_ms: f32,
        #[serde(default = "defaults::release_ms")]
        release_ms: f32,
    },
    SetCompressorMakeup {
        #[serde(default)]
        gain_db: f32,
    },
    SetLimiter {
        #[serde(default = "defaults::limit_threshold_db")]
        threshold_db: f32,
    },
    SetReverb {
        #[serde(default)]
        mix: f32,
    },
    SetReverbFeedback {
        #[serde(default = "defaults::feedback")]
        feedback: f32,
    },
    /// Clear all filter, envelope and delay history; configuration is kept
    Reset,
}

impl ControlMessage {
    /// Parse a JSON-encoded message
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Notification from the render side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ControlEvent {
    /// `init` completed; the pipeline is processing at `sample_rate`
    Ready { sample_rate: f32 },
}

mod defaults {
    use super::*;

    pub fn sample_rate() -> f32 {
        48000.0
    }

    pub fn low_freq() -> f32 {
        Equalizer::DEFAULT_LOW_FREQ
    }

    pub fn mid_freq() -> f32 {
        Equalizer::DEFAULT_MID_FREQ
    }

    pub fn high_freq() -> f32 {
        Equalizer::DEFAULT_HIGH_FREQ
    }

    pub fn mid_q() -> f32 {
        Equalizer::DEFAULT_MID_Q
    }

    pub fn comp_threshold_db() -> f32 {
        Compressor::DEFAULT_THRESHOLD_DB
    }

    pub fn ratio() -> f32 {
        Compressor::DEFAULT_RATIO
    }

    pub fn attack_ms() -> f32 {
        Compressor::DEFAULT_ATTACK_MS
    }

    pub fn release_ms() -> f32 {
        Compressor::DEFAULT_RELEASE_MS
    }

    pub fn limit_threshold_db() -> f32 {
        Limiter::DEFAULT_THRESHOLD_DB
    }

    pub fn feedback() -> f32 {
        Reverb::DEFAULT_FEEDBACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_eq() {
        let msg =
            ControlMessage::from_json(r#"{"type":"setEq","lowGainDb":3,"midGainDb":-2.5,"highGainDb":1}"#)
                .unwrap();
        assert_eq!(
            msg,
            ControlMessage::SetEq {
                low_gain_db: 3.0,
                mid_gain_db: -2.5,
                high_gain_db: 1.0,
            }
        );
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let msg = ControlMessage::from_json(r#"{"type":"setCompressor","ratio":8}"#).unwrap();
        assert_eq!(
            msg,
            ControlMessage::SetCompressor {
                threshold_db: -24.0,
                ratio: 8.0,
                attack_ms: 5.0,
                release_ms: 100.0,
            }
        );

        let msg = ControlMessage::from_json(r#"{"type":"init"}"#).unwrap();
        assert_eq!(msg, ControlMessage::Init { sample_rate: 48000.0 });

        let msg = ControlMessage::from_json(r#"{"type":"setLimiter"}"#).unwrap();
        assert_eq!(msg, ControlMessage::SetLimiter { threshold_db: -0.1 });
    }

    #[test]
    fn test_parse_reset() {
        let msg = ControlMessage::from_json(r#"{"type":"reset"}"#).unwrap();
        assert_eq!(msg, ControlMessage::Reset);
    }

    #[test]
    fn test_serialized_shape() {
        let json = ControlMessage::SetReverb { mix: 0.25 }.to_json().unwrap();
        assert_eq!(json, r#"{"type":"setReverb","mix":0.25}"#);

        let event = serde_json::to_string(&ControlEvent::Ready { sample_rate: 44100.0 }).unwrap();
        assert_eq!(event, r#"{"type":"ready","sampleRate":44100.0}"#);
    }

    #[test]
    fn test_malformed_messages() {
        assert!(matches!(
            ControlMessage::from_json(r#"{"type":"setVolume","gain":1}"#),
            Err(ControlError::Malformed(_))
        ));
        assert!(matches!(
            ControlMessage::from_json("not json"),
            Err(ControlError::Malformed(_))
        ));
        assert!(matches!(
            ControlMessage::from_json(r#"{"type":"setEq","lowGainDb":"loud"}"#),
            Err(ControlError::Malformed(_))
        ));
    }

    #[test]
    fn test_queue_full_display() {
        let err = ControlError::QueueFull(ControlMessage::Reset);
        assert_eq!(err.to_string(), "Control queue full, dropped Reset");
    }
}
