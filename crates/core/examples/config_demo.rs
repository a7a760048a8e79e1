//! Example demonstrating configuration files and the message-driven chain
//!
//! Run with: cargo run --package cadence-core --example config_demo

use cadence_core::domain::{gain_to_db, peak_level, EngineConfig, Pipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("cadence_core=debug,info")
        .init();

    println!("=== Cadence Configuration Demo ===\n");

    // 1. Start from defaults and shape the chain
    println!("1. Building a configuration...");
    let mut config = EngineConfig::default();
    config.chain.eq.low_gain_db = 4.0;
    config.chain.eq.high_gain_db = -2.0;
    config.chain.compressor.threshold_db = -18.0;
    config.chain.reverb.mix = 0.25;
    println!("   ✓ {} Hz, {} frame blocks", config.sample_rate, config.block_size);

    // 2. Save configuration to file
    println!("\n2. Saving configuration to file...");
    let config_path = "demo_config.toml";
    config.save_to_file(config_path).await?;
    println!("   ✓ Configuration saved to {}", config_path);

    // 3. Load configuration from file
    println!("\n3. Loading configuration from file...");
    let loaded = EngineConfig::load_from_file(config_path).await?;
    println!("   ✓ Round trip identical: {}", loaded == config);

    // 4. Turn the configuration into control messages
    println!("\n4. Control messages:");
    let messages = loaded.to_messages();
    for message in &messages {
        println!("   {}", message.to_json()?);
    }

    // 5. Drive a pipeline with them
    println!("\n5. Rendering one second of a 0 dBFS sine...");
    let mut pipeline = Pipeline::new();
    for message in messages {
        if let Some(event) = pipeline.apply(message)? {
            println!("   ← {:?}", event);
        }
    }

    let sample_rate = loaded.sample_rate as f32;
    let input: Vec<f32> = (0..loaded.sample_rate as usize)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate).sin())
        .collect();
    let mut left = vec![0.0; input.len()];
    let mut right = vec![0.0; input.len()];
    for ((block, out_left), out_right) in input
        .chunks(loaded.block_size)
        .zip(left.chunks_mut(loaded.block_size))
        .zip(right.chunks_mut(loaded.block_size))
    {
        pipeline.process_block(&[block], &mut [out_left, out_right]);
    }

    println!("   input peak:  {:.2} dBFS", gain_to_db(peak_level(&input)));
    println!("   output peak: {:.2} dBFS", gain_to_db(peak_level(&left)));
    println!(
        "   gain reduction: {:.2} dB compressor, {:.2} dB limiter",
        pipeline.compressor_gain_reduction_db(),
        pipeline.limiter_gain_reduction_db()
    );

    println!("\n=== Demo Complete ===");

    // Cleanup
    std::fs::remove_file(config_path)?;

    Ok(())
}
