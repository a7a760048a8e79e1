//! Cross-crate integration tests for the Cadence effects chain

#[cfg(test)]
mod pipeline_integration;
