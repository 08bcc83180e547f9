//! Helix Miner - multi-threaded CPU miner for the Helix chained-hash family
//!
//! This crate provides a complete implementation of a Helix proof-of-work miner with support for:
//! - Both Helix chain variants (v2 and the legacy v1)
//! - Midstate caching and a per-thread memory-hard scratch matrix
//! - Both pool and solo mining modes
//! - Performance benchmarking
//! - Hardware monitoring
//!
//! The hash chains are composed from RustCrypto digest primitives around
//! an in-tree memory-hard mixing stage; a startup-time registry picks the
//! algorithm and its permutation kernel from configuration and probed CPU
//! features.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Miner core implementation including algorithms, contexts and scheduling
pub mod miner;

/// Network communication components for pool and node connections
pub mod network;

/// Statistics collection and reporting functionality
pub mod stats;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use cli::Commands;
pub use config::Config;
pub use miner::{Algorithm, MiningJob, Registry, ScanOutcome, Scheduler, Share, Target, Work, Worker};
pub use network::{NodeClient, PoolClient};
pub use stats::{HardwareStats, MiningStats, StatsReporter};
pub use types::AlgorithmType;
pub use utils::{MinerError, init_logging};
