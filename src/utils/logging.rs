// src/utils/logging.rs
//! Logging configuration and utilities
//!
//! This module handles logging setup for the miner application, including:
//! - Standard logging configuration
//! - Benchmark-specific logging
//! - Custom log formatting with the originating thread
//!
//! Uses `env_logger` under the hood with custom formatting and filtering.
//! Every line carries the thread name because almost all interesting
//! events happen on per-slot worker threads.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;
use std::thread;

/// Initializes the logging subsystem with sensible defaults
///
/// # Configuration
/// - Logs to stdout
/// - Default log level: Info
/// - Timestamp, level, thread and module formatting
/// - Respects `RUST_LOG` environment variable if set
pub fn init_logging() {
    let mut builder = common_log_config();

    if env::var("RUST_LOG").is_err() {
        builder.filter_level(LevelFilter::Info);
    } else {
        builder.parse_env("RUST_LOG");
    }

    builder.init();
}

/// Configures benchmark-specific logging
///
/// # Differences from Standard Logging
/// - Default log level: Debug (if RUST_LOG not set)
/// - More verbose output by default
/// - Same formatting as standard logging
pub fn init_bench_logging() {
    let mut builder = common_log_config();

    if env::var("RUST_LOG").is_err() {
        builder.filter_level(LevelFilter::Debug);
    } else {
        builder.parse_env("RUST_LOG");
    }

    builder.init();
}

/// Creates and configures a base logger builder with common settings
///
/// # Features
/// - Custom log format including:
///   - Timestamp (seconds since epoch)
///   - Log level
///   - Thread name (worker threads are named `miner-<slot>`)
///   - Module path
///   - Message
/// - Output to stdout
///
/// # Returns
/// Partially configured `env_logger::Builder` instance
fn common_log_config() -> Builder {
    let mut builder = Builder::new();

    builder
        .format(|buf, record| {
            use std::io::Write;
            let ts = buf.timestamp_seconds();
            let level = record.level();
            let current = thread::current();
            let thread_name = current.name().unwrap_or("?");
            let module = record.module_path().unwrap_or_default();

            writeln!(
                buf,
                "[{} {} {} {}] {}",
                ts,
                level,
                thread_name,
                module,
                record.args()
            )
        })
        .target(Target::Stdout);

    builder
}
