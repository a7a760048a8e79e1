//! Integration tests for the effects chain
//!
//! These drive the pipeline the way a host does: messages through the
//! lock-free control channel, audio in fixed-size blocks on the engine.

use cadence_core::domain::{
    db_to_gain, ChainSettings, ControlEvent, ControlMessage, EngineConfig, Pipeline,
    PipelineState,
};
use cadence_infra::analysis::{magnitude_spectrum, peak_dbfs};
use cadence_infra::{control_channel, ControlSender, RealtimeEngine};
use proptest::prelude::*;

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZE: usize = 128;

fn generate_sine_wave(frequency: f32, amplitude: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| 2.0 * std::f32::consts::PI * frequency * i as f32 / SAMPLE_RATE)
        .map(|phase| amplitude * phase.sin())
        .collect()
}

fn render_blocks(engine: &mut RealtimeEngine, input: &[f32], block_size: usize) -> (Vec<f32>, Vec<f32>) {
    let mut left = vec![0.0; input.len()];
    let mut right = vec![0.0; input.len()];
    for ((block, out_left), out_right) in input
        .chunks(block_size)
        .zip(left.chunks_mut(block_size))
        .zip(right.chunks_mut(block_size))
    {
        engine.process(&[block], &mut [out_left, out_right]);
    }
    (left, right)
}

fn send_all(tx: &ControlSender, messages: &[ControlMessage]) {
    for &message in messages {
        tx.send(message).unwrap();
    }
}

fn scenario_messages() -> Vec<ControlMessage> {
    vec![
        ControlMessage::Init {
            sample_rate: SAMPLE_RATE,
        },
        ControlMessage::SetEq {
            low_gain_db: 0.0,
            mid_gain_db: 0.0,
            high_gain_db: 0.0,
        },
        ControlMessage::SetCompressor {
            threshold_db: -24.0,
            ratio: 4.0,
            attack_ms: 5.0,
            release_ms: 100.0,
        },
        ControlMessage::SetLimiter { threshold_db: -0.1 },
        ControlMessage::SetReverb { mix: 0.0 },
    ]
}

// ============================================================================
// END-TO-END SCENARIO
// ============================================================================

#[test]
fn test_full_scale_sine_burst() {
    let (tx, rx) = control_channel(16);
    let mut engine = RealtimeEngine::new(rx);
    send_all(&tx, &scenario_messages());

    let input = generate_sine_wave(1000.0, 1.0, SAMPLE_RATE as usize);
    let (left, right) = render_blocks(&mut engine, &input, BLOCK_SIZE);

    assert_eq!(
        tx.try_recv_event(),
        Some(ControlEvent::Ready {
            sample_rate: SAMPLE_RATE
        })
    );
    assert_eq!(engine.pipeline().state(), PipelineState::Active);
    assert_eq!(engine.rejected_messages(), 0);

    // Mono input duplicated into both lanes
    assert_eq!(left, right);

    // The limiter caps the onset transient; afterwards the compressor holds the level down
    let out_peak = peak_dbfs(&left);
    assert!(out_peak <= -0.1 + 0.01, "output peak {out_peak} dBFS");
    assert!(out_peak > -6.0, "output peak {out_peak} dBFS");

    let steady = &left[left.len() / 2..];
    assert!(peak_dbfs(steady) < -12.0);
    assert!(engine.pipeline().compressor_gain_reduction_db() > 12.0);

    // EQ-neutral: the fundamental stays dominant and no band is emphasized
    let spectrum = magnitude_spectrum(steady, SAMPLE_RATE);
    assert!((spectrum.dominant_frequency() - 1000.0).abs() <= spectrum.bin_hz);
    let fundamental = spectrum.magnitude_at(1000.0);
    for harmonic in [2000.0, 3000.0, 5000.0] {
        assert!(spectrum.magnitude_at(harmonic) < fundamental * 0.03);
    }
}

#[test]
fn test_block_before_init_is_untouched() {
    let (tx, rx) = control_channel(16);
    let mut engine = RealtimeEngine::new(rx);

    let loud = generate_sine_wave(440.0, 2.0, BLOCK_SIZE);
    let (left, _) = render_blocks(&mut engine, &loud, BLOCK_SIZE);
    assert_eq!(left, loud);

    send_all(&tx, &scenario_messages());
    let (left, _) = render_blocks(&mut engine, &loud, BLOCK_SIZE);
    assert!(peak_dbfs(&left) <= -0.1 + 0.01);
}

// ============================================================================
// CONTROL CHANNEL
// ============================================================================

#[test]
fn test_json_messages_match_typed_messages() {
    let input = generate_sine_wave(220.0, 0.8, 4800);

    let (typed_tx, typed_rx) = control_channel(16);
    let mut typed = RealtimeEngine::new(typed_rx);
    send_all(
        &typed_tx,
        &[
            ControlMessage::Init {
                sample_rate: SAMPLE_RATE,
            },
            ControlMessage::SetEq {
                low_gain_db: 6.0,
                mid_gain_db: -3.0,
                high_gain_db: 0.0,
            },
            ControlMessage::SetReverb { mix: 0.35 },
        ],
    );

    let (json_tx, json_rx) = control_channel(16);
    let mut json = RealtimeEngine::new(json_rx);
    for message in [
        r#"{"type":"init","sampleRate":48000}"#,
        r#"{"type":"setEq","lowGainDb":6,"midGainDb":-3}"#,
        r#"{"type":"setReverb","mix":0.35}"#,
    ] {
        json_tx.send_json(message).unwrap();
    }

    assert_eq!(
        render_blocks(&mut typed, &input, BLOCK_SIZE),
        render_blocks(&mut json, &input, BLOCK_SIZE)
    );
}

#[test]
fn test_message_lands_between_blocks() {
    let input = generate_sine_wave(330.0, 0.5, BLOCK_SIZE * 8);
    let (first, second) = input.split_at(BLOCK_SIZE * 4);

    // Reference: apply directly on a bare pipeline at the same boundary
    let mut pipeline = Pipeline::new();
    pipeline
        .apply(ControlMessage::Init {
            sample_rate: SAMPLE_RATE,
        })
        .unwrap();
    let mut expected = vec![0.0; input.len()];
    {
        let (out_first, out_second) = expected.split_at_mut(first.len());
        let mut scratch = vec![0.0; first.len()];
        pipeline.process_block(&[first], &mut [out_first, &mut scratch[..]]);
        pipeline.apply(ControlMessage::SetReverb { mix: 0.6 }).unwrap();
        let mut scratch = vec![0.0; second.len()];
        pipeline.process_block(&[second], &mut [out_second, &mut scratch[..]]);
    }

    let (tx, rx) = control_channel(16);
    let mut engine = RealtimeEngine::new(rx);
    tx.send(ControlMessage::Init {
        sample_rate: SAMPLE_RATE,
    })
    .unwrap();
    let (mut left, _) = render_blocks(&mut engine, first, first.len());
    tx.send(ControlMessage::SetReverb { mix: 0.6 }).unwrap();
    let (tail, _) = render_blocks(&mut engine, second, second.len());
    left.extend(tail);

    assert_eq!(left, expected);
}

#[test]
fn test_reinit_at_new_rate() {
    let (tx, rx) = control_channel(16);
    let mut engine = RealtimeEngine::new(rx);

    tx.send(ControlMessage::Init {
        sample_rate: SAMPLE_RATE,
    })
    .unwrap();
    tx.send(ControlMessage::SetReverb { mix: 0.5 }).unwrap();
    engine.drain_messages();

    tx.send(ControlMessage::Init {
        sample_rate: 44100.0,
    })
    .unwrap();
    engine.drain_messages();

    assert_eq!(engine.pipeline().sample_rate(), Some(44100.0));
    // Settings survive re-initialization
    assert!(engine.pipeline().reverb_enabled());
    assert_eq!(
        tx.try_recv_event(),
        Some(ControlEvent::Ready {
            sample_rate: SAMPLE_RATE
        })
    );
    assert_eq!(
        tx.try_recv_event(),
        Some(ControlEvent::Ready {
            sample_rate: 44100.0
        })
    );
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_config_messages_drive_engine() {
    let mut config = EngineConfig::default();
    config.chain.eq.high_gain_db = -4.0;
    config.chain.compressor.makeup_gain_db = 3.0;
    config.chain.reverb.mix = 0.2;

    let messages = config.to_messages();
    let (tx, rx) = control_channel(config.queue_capacity);
    let mut engine = RealtimeEngine::new(rx);
    send_all(&tx, &messages);
    engine.drain_messages();

    assert_eq!(engine.pipeline().sample_rate(), Some(48000.0));
    assert_eq!(*engine.pipeline().settings(), config.chain);
    assert_ne!(config.chain, ChainSettings::default());
}

proptest! {
    #[test]
    fn prop_output_length_matches_input(
        block_size in 1usize..512,
        num_samples in 0usize..2048,
        mix in 0.0f32..1.0,
    ) {
        let (tx, rx) = control_channel(8);
        let mut engine = RealtimeEngine::new(rx);
        tx.send(ControlMessage::Init { sample_rate: SAMPLE_RATE }).unwrap();
        tx.send(ControlMessage::SetReverb { mix }).unwrap();

        let input = generate_sine_wave(500.0, 1.5, num_samples);
        let (left, right) = render_blocks(&mut engine, &input, block_size);

        prop_assert_eq!(left.len(), input.len());
        prop_assert_eq!(right.len(), input.len());
        let ceiling = db_to_gain(-0.1);
        // Past the first cycle the limiter holds the ceiling
        prop_assert!(left.iter().skip(96).all(|s| s.abs() <= ceiling + 1e-3));
    }
}
