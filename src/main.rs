// src/main.rs
use clap::Parser;
use crossbeam_channel::unbounded;
use helix_miner_rs::miner::features::CpuFeatures;
use helix_miner_rs::miner::work::{HEADER_WORDS, RestartFlag, Work, set_benchmark_mode};
use helix_miner_rs::utils::logging::init_bench_logging;
use helix_miner_rs::{
    AlgorithmType, MinerError, Registry, ScanOutcome, Scheduler, cli, config, network, stats, utils,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Main entry point for the Helix miner
///
/// # Returns
/// - `Ok(())` on successful execution
/// - `Err(MinerError)` if any operation fails
///
/// # Flow
/// 1. Parses command line arguments
/// 2. Delegates to appropriate subcommand handler
/// 3. Propagates any errors upward
fn main() -> Result<(), MinerError> {
    let cli = cli::Commands::parse();

    match cli.action {
        cli::Action::Start(opts) => start_mining(opts),
        cli::Action::Benchmark(opts) => run_benchmark(opts),
        cli::Action::Config(opts) => generate_config(opts),
    }
}

/// Starts the mining operation with given configuration options
///
/// # Arguments
/// * `opts` - Command line options for mining operation
///
/// # Operations
/// 1. Initializes logging
/// 2. Loads and validates configuration
/// 3. Probes CPU features and resolves the algorithm from the registry
/// 4. Spawns the worker pool
/// 5. Connects to pool/node based on configuration and bridges jobs in
fn start_mining(opts: cli::StartOptions) -> Result<(), MinerError> {
    utils::init_logging();

    let mut config = config::load(&opts.config)?;
    // Apply CLI overrides
    if let Some(workers) = opts.workers {
        config.worker_threads = workers;
    }
    if let Some(algo) = opts.algorithm {
        config.algorithm = algo.to_string();
    }

    let algo_type: AlgorithmType = config
        .algorithm
        .parse()
        .map_err(|_| MinerError::ConfigError(format!("Invalid algorithm: {}", config.algorithm)))?;

    // Resolve the algorithm once; the handle lives for the whole process.
    let features = CpuFeatures::detect();
    log::info!("CPU features: {}", features);
    let registry = Registry::with_builtins(&features);
    let algorithm = registry.resolve(algo_type)?;

    // Communication channels
    let (share_sender, share_receiver) = unbounded(); // For submitting shares
    let (job_sender, job_receiver) = unbounded(); // For receiving work

    // Statistics reporting
    let reporter = stats::StatsReporter::new(Duration::from_secs(60));
    reporter.start_reporting();

    // Mining setup
    let scheduler = Arc::new(Scheduler::new(
        share_sender,
        config.batch_size,
        config.worker_threads,
    ));
    scheduler.start(algorithm, reporter.hash_sender());

    // Bridge jobs from the network layer onto the scheduler.
    {
        let scheduler = Arc::clone(&scheduler);
        std::thread::spawn(move || {
            for job in job_receiver.iter() {
                scheduler.update_job(job);
            }
        });
    }

    let result_sender = reporter.share_sender();

    // Runtime setup
    let rt = Runtime::new()?;
    rt.block_on(async {
        match config.mode {
            config::MiningMode::Pool(pool_cfg) => {
                let pool =
                    network::PoolClient::new(pool_cfg, job_sender, share_receiver, result_sender);
                pool.connect().await?;
                pool.run().await
            }
            config::MiningMode::Node(node_cfg) => {
                let mut node =
                    network::NodeClient::new(node_cfg, job_sender, share_receiver, result_sender);
                node.run().await
            }
        }
    })
}

/// Runs mining algorithm benchmarks
///
/// # Arguments
/// * `opts` - Benchmark configuration options
///
/// # Operations
/// 1. Initializes benchmark-specific logging
/// 2. Resolves the algorithm and enables the benchmark target override
/// 3. Spawns scan threads over synthetic headers
/// 4. Collects and reports performance statistics
fn run_benchmark(opts: cli::BenchmarkOptions) -> Result<(), MinerError> {
    init_bench_logging();

    let features = CpuFeatures::detect();
    log::info!("CPU features: {}", features);
    let registry = Registry::with_builtins(&features);
    let algorithm = registry.resolve(opts.algorithm)?;

    // Relax the target's most significant word so synthetic matches show
    // up fast enough to exercise the full found-share path.
    set_benchmark_mode(true);

    let reporter = stats::StatsReporter::new(Duration::from_secs(5));
    let hash_sender = reporter.hash_sender();

    log::info!(
        "Starting {} benchmark for {} seconds on {} threads",
        opts.algorithm,
        opts.duration,
        opts.threads
    );
    log::logger().flush();

    let start_time = std::time::Instant::now();
    let handles: Vec<_> = (0..opts.threads)
        .map(|slot| {
            let algo = algorithm.clone();
            let sender = hash_sender.clone();
            let duration = opts.duration;
            std::thread::spawn(move || {
                let mut ctx = match algo.thread_init() {
                    Ok(ctx) => ctx,
                    Err(e) => {
                        log::error!("bench thread {}: init failed: {}", slot, e);
                        return;
                    }
                };
                let restart = RestartFlag::new();

                // Synthetic template, distinct per thread.
                let mut data = [0u32; HEADER_WORDS];
                data[0] = slot as u32;
                let target = algo.scale_target(1_000_000.0);
                let mut work = Work::new(format!("bench-{}", slot), data, target);

                let mut last_log = std::time::Instant::now();
                let mut window_hashes: u64 = 0;

                while start_time.elapsed().as_secs() < duration {
                    let current = work.nonce();
                    if current == u32::MAX {
                        work.set_nonce(0);
                        continue;
                    }
                    let window_end = current.saturating_add(256);
                    let outcome = algo.scan(&mut ctx, &mut work, window_end, &restart);
                    let done = outcome.hashes_done();
                    window_hashes += done;
                    let _ = sender.send(done);

                    if let ScanOutcome::Found { nonce, .. } = outcome {
                        work.set_nonce(nonce.wrapping_add(1));
                    }

                    // Log progress every second
                    if last_log.elapsed().as_secs() >= 1 {
                        log::debug!(
                            "Thread {:?}: {:.1} H/s",
                            std::thread::current().id(),
                            window_hashes as f64 / last_log.elapsed().as_secs_f64()
                        );
                        window_hashes = 0;
                        last_log = std::time::Instant::now();
                    }
                }
            })
        })
        .collect();

    // Wait for all threads to complete
    for handle in handles {
        if handle.join().is_err() {
            log::error!("benchmark thread panicked");
        }
    }

    // Report final results
    let stats = reporter.get_stats();
    log::info!("Benchmark results:");
    log::info!("Total hashes: {}", stats.hashes_total);
    log::info!("Average hashrate: {:.2} H/s", stats.avg_hashrate);
    log::logger().flush();

    Ok(())
}

/// Generates configuration template file
///
/// # Arguments
/// * `opts` - Configuration generation options
///
/// # Operations
/// 1. Generates template content based on options
/// 2. Writes template to specified output file
fn generate_config(opts: cli::ConfigOptions) -> Result<(), MinerError> {
    let config = config::generate_template(opts.pool, opts.node);
    std::fs::write(opts.output, config)?;
    Ok(())
}
