// src/cli/mod.rs
//! Command-line interface definitions
//!
//! Declares the clap command tree for the miner binary: starting a mining
//! session, running algorithm benchmarks, and generating configuration
//! templates.

/// Command and option structs for the miner binary
pub mod commands;

// Re-export for easier access
pub use commands::{Action, BenchmarkOptions, Commands, ConfigOptions, StartOptions};
