// src/miner/mod.rs
//! Core mining functionality
//!
//! This module contains all components related to the mining process:
//! - Algorithm implementations and their dispatch registry
//! - The primitive template pool and per-thread contexts
//! - The memory-hard mixing stage
//! - Job scheduling, worker threads and scan outcomes

/// Mining algorithm implementations
///
/// Contains the [`Algorithm`] dispatch trait with the shared scan driver,
/// and the Helix chain variants.
pub mod algorithm;

/// Per-thread mining context
///
/// The scratch matrix and cached midstate owned by each worker thread.
pub mod context;

/// CPU capability probing
///
/// One-time startup detection of vector extensions, used to pick the
/// mixing-stage kernel.
pub mod features;

/// Memory-hard mixing stage
///
/// Duplex-sponge mixer operating on the caller's scratch matrix.
pub mod memhash;

/// Primitive context pool
///
/// Process-wide read-only hasher templates, cloned per use.
pub mod primitives;

/// Algorithm dispatch registry
///
/// Startup-time table mapping algorithm identifiers to implementations.
pub mod registry;

/// Mining job scheduler
///
/// Handles job swaps, restart signaling and worker spawning.
pub mod scheduler;

/// Work units, targets and scan outcomes
///
/// Header templates, target arithmetic, restart flags and the benchmark
/// override.
pub mod work;

/// Worker thread implementation
///
/// Per-slot scan loop driving the pipeline against the current job.
pub mod worker;

// Re-export main components for cleaner imports
pub use self::algorithm::Algorithm;
pub use self::context::ThreadContext;
pub use self::features::{CpuFeature, CpuFeatures};
pub use self::registry::Registry;
pub use self::scheduler::{MiningJob, Scheduler, Share};
pub use self::work::{RestartFlag, ScanOutcome, Target, Work, set_benchmark_mode};
pub use self::worker::Worker;
