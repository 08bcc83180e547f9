// src/miner/scheduler.rs
//! Mining job scheduler implementation
//!
//! Owns the shared state the worker pool runs against: the current job
//! (atomically swappable), the per-slot restart flags, and the channels
//! shares and hash counts travel over. Swapping in a new job raises every
//! restart flag so workers abandon the stale template at their next scan
//! iteration; cancellation stays advisory and cooperative.

use crate::miner::algorithm::Algorithm;
use crate::miner::work::RestartFlag;
use crate::miner::worker::Worker;
use crate::types::AlgorithmType;
use arc_swap::ArcSwap;
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Represents a mining job received from the pool or node
#[derive(Debug, Clone)]
pub struct MiningJob {
    /// Unique identifier for the job
    pub job_id: String,
    /// 80-byte header template (nonce field at bytes 76..80)
    pub header: Vec<u8>,
    /// External difficulty; converted to a target via the algorithm's
    /// scaling rule
    pub difficulty: f64,
    /// First nonce the job source wants scanned
    pub start_nonce: u32,
    /// Algorithm to use for this job
    pub algorithm: AlgorithmType,
}

/// Represents a valid share found by a worker
#[derive(Debug, Clone)]
pub struct Share {
    /// Job ID this share belongs to
    pub job_id: String,
    /// Nonce that produced the winning digest
    pub nonce: u32,
    /// Resulting digest that meets the target
    pub result: [u8; 32],
}

/// Coordinates mining jobs across worker threads
pub struct Scheduler {
    /// Current active job (atomically swappable)
    current_job: Arc<ArcSwap<Option<MiningJob>>>,
    /// One restart flag per worker slot, raised on every job swap
    restart_flags: Arc<Vec<RestartFlag>>,
    /// Flag to control worker threads
    active: Arc<AtomicBool>,
    /// Channel for sending found shares
    share_sender: Sender<Share>,
    /// Nonces each worker scans per batch between stats updates
    batch_size: u32,
    /// Number of worker slots
    workers: usize,
}

impl Scheduler {
    /// Creates a new Scheduler instance
    ///
    /// # Arguments
    /// * `share_sender` - Channel for sending found shares
    /// * `batch_size` - Nonces each worker scans per batch
    /// * `workers` - Number of worker threads that will be spawned
    pub fn new(share_sender: Sender<Share>, batch_size: u32, workers: usize) -> Self {
        let restart_flags: Vec<RestartFlag> = (0..workers).map(|_| RestartFlag::new()).collect();
        Scheduler {
            current_job: Arc::new(ArcSwap::from_pointee(None)),
            restart_flags: Arc::new(restart_flags),
            active: Arc::new(AtomicBool::new(true)),
            share_sender,
            batch_size,
            workers,
        }
    }

    /// Replaces the current job and signals every worker to restart
    ///
    /// Workers notice the raised flag at their next scan iteration, so
    /// staleness is bounded by one pipeline invocation.
    pub fn update_job(&self, job: MiningJob) {
        log::debug!(
            "job update: {} (difficulty {}, algo {})",
            job.job_id,
            job.difficulty,
            job.algorithm
        );
        self.current_job.store(Arc::new(Some(job)));
        for flag in self.restart_flags.iter() {
            flag.set();
        }
    }

    /// Spawns the worker pool against a resolved algorithm handle
    ///
    /// # Arguments
    /// * `algorithm` - Handle resolved from the registry at startup
    /// * `hash_sender` - Stats channel receiving per-batch hash counts
    pub fn start(&self, algorithm: Arc<dyn Algorithm>, hash_sender: Sender<u64>) {
        for slot in 0..self.workers {
            let worker = Worker::new(
                slot,
                self.workers,
                self.batch_size,
                algorithm.clone(),
                Arc::clone(&self.current_job),
                Arc::clone(&self.restart_flags),
                Arc::clone(&self.active),
                self.share_sender.clone(),
                hash_sender.clone(),
            );
            let spawned = std::thread::Builder::new()
                .name(format!("miner-{}", slot))
                .spawn(move || worker.run());
            if let Err(e) = spawned {
                log::error!("failed to spawn worker {}: {}", slot, e);
            }
        }
    }

    /// Stops all mining workers
    ///
    /// Raises every restart flag as well so in-progress scans return at
    /// their next iteration instead of finishing their window.
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
        for flag in self.restart_flags.iter() {
            flag.set();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn job_update_raises_every_restart_flag() {
        let (tx, _rx) = unbounded();
        let scheduler = Scheduler::new(tx, 1000, 3);

        for flag in scheduler.restart_flags.iter() {
            assert!(!flag.is_set());
        }

        scheduler.update_job(MiningJob {
            job_id: "j1".into(),
            header: vec![0u8; 80],
            difficulty: 1.0,
            start_nonce: 0,
            algorithm: AlgorithmType::HelixV1,
        });

        for flag in scheduler.restart_flags.iter() {
            assert!(flag.is_set());
        }
        assert!(scheduler.current_job.load().is_some());
    }

    #[test]
    fn stop_clears_active_and_raises_flags() {
        let (tx, _rx) = unbounded();
        let scheduler = Scheduler::new(tx, 1000, 2);
        assert!(scheduler.active.load(Ordering::Relaxed));

        scheduler.stop();
        assert!(!scheduler.active.load(Ordering::Relaxed));
        for flag in scheduler.restart_flags.iter() {
            assert!(flag.is_set());
        }
    }
}
