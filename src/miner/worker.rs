// src/miner/worker.rs
//! Worker thread implementation
//!
//! Each worker owns one slot of the nonce space and one thread-local
//! mining context, and runs its scan loop until the scheduler deactivates
//! the pool. The only cross-thread traffic on the hot path is the
//! read-only restart flag for the worker's slot; scratch matrix and
//! midstate never leave the thread.

use crate::miner::algorithm::Algorithm;
use crate::miner::scheduler::{MiningJob, Share};
use crate::miner::work::{RestartFlag, ScanOutcome, Work};
use arc_swap::ArcSwap;
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How long an idle worker sleeps before re-checking for a job.
const IDLE_WAIT: Duration = Duration::from_millis(100);

/// Worker thread that performs the nonce scan for one slot
pub struct Worker {
    /// This worker's slot index, also its restart-flag index
    slot: usize,
    /// Total number of worker slots (for nonce-space partitioning)
    total: usize,
    /// Nonces to scan per batch between stats updates
    batch_size: u32,
    /// Resolved algorithm handle, held for the thread's lifetime
    algorithm: Arc<dyn Algorithm>,
    /// Current job shared with the scheduler
    current_job: Arc<ArcSwap<Option<MiningJob>>>,
    /// All restart flags; this worker polls only its own slot
    restart_flags: Arc<Vec<RestartFlag>>,
    /// Pool-wide liveness flag
    active: Arc<AtomicBool>,
    /// Channel for sending found shares back to the job source
    share_sender: Sender<Share>,
    /// Channel for reporting per-batch hash counts to stats
    hash_sender: Sender<u64>,
}

impl Worker {
    /// Creates a new Worker bound to a slot
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        slot: usize,
        total: usize,
        batch_size: u32,
        algorithm: Arc<dyn Algorithm>,
        current_job: Arc<ArcSwap<Option<MiningJob>>>,
        restart_flags: Arc<Vec<RestartFlag>>,
        active: Arc<AtomicBool>,
        share_sender: Sender<Share>,
        hash_sender: Sender<u64>,
    ) -> Self {
        Worker {
            slot,
            total,
            batch_size,
            algorithm,
            current_job,
            restart_flags,
            active,
            share_sender,
            hash_sender,
        }
    }

    /// Runs the worker until the pool is deactivated
    ///
    /// Allocates the thread-local context first; if that fails the worker
    /// logs and exits, because scanning without a scratch matrix is not
    /// possible and the condition does not improve by retrying.
    pub fn run(self) {
        let mut ctx = match self.algorithm.thread_init() {
            Ok(ctx) => ctx,
            Err(e) => {
                log::error!("worker {}: thread init failed: {}", self.slot, e);
                return;
            }
        };

        // Disjoint nonce span for this slot.
        let span = u32::MAX / self.total as u32;
        let base = span * self.slot as u32;
        let end = if self.slot + 1 == self.total {
            u32::MAX
        } else {
            base + span
        };

        let mut work: Option<Work> = None;
        let mut active_job_id: Option<String> = None;

        while self.active.load(Ordering::Relaxed) {
            let job_guard = self.current_job.load();
            let Some(job) = &**job_guard else {
                std::thread::sleep(IDLE_WAIT);
                continue;
            };

            if active_job_id.as_deref() != Some(job.job_id.as_str()) {
                // Adopt the new job: build the target once, reset the
                // nonce to this slot's span, clear our restart flag.
                let target = self.algorithm.scale_target(job.difficulty);
                match Work::from_header_bytes(&job.job_id, &job.header, target) {
                    Ok(mut w) => {
                        w.set_nonce(job.start_nonce.clamp(base, end));
                        work = Some(w);
                    }
                    Err(e) => {
                        log::warn!("worker {}: rejected job {}: {}", self.slot, job.job_id, e);
                        work = None;
                    }
                }
                active_job_id = Some(job.job_id.clone());
                self.restart_flags[self.slot].clear();
            }

            let Some(w) = work.as_mut() else {
                std::thread::sleep(IDLE_WAIT);
                continue;
            };

            let current = w.nonce();
            if current >= end {
                // Span exhausted; nothing to do until a new job arrives.
                std::thread::sleep(IDLE_WAIT);
                continue;
            }

            let window_end = current.saturating_add(self.batch_size).min(end);
            let outcome =
                self.algorithm
                    .scan(&mut ctx, w, window_end, &self.restart_flags[self.slot]);
            let _ = self.hash_sender.send(outcome.hashes_done());

            match outcome {
                ScanOutcome::Found { nonce, hash, .. } => {
                    log::info!(
                        "worker {}: share found, job {} nonce {:08x}",
                        self.slot,
                        w.job_id,
                        nonce
                    );
                    let _ = self.share_sender.send(Share {
                        job_id: w.job_id.clone(),
                        nonce,
                        result: hash,
                    });
                    // Keep scanning the rest of the span for more shares.
                    w.set_nonce(nonce.saturating_add(1));
                }
                ScanOutcome::Restarted { .. } => {
                    // Force re-adoption of whatever job is current now.
                    active_job_id = None;
                }
                ScanOutcome::Exhausted { .. } => {
                    // Window done, nonce already advanced; next batch.
                }
            }
        }

        log::debug!("worker {}: stopped", self.slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::features::CpuFeatures;
    use crate::miner::registry::Registry;
    use crate::miner::scheduler::Scheduler;
    use crate::types::AlgorithmType;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    #[test]
    fn worker_pool_finds_shares_on_an_easy_job() {
        let registry = Registry::with_builtins(&CpuFeatures::default());
        let algorithm = registry.resolve(AlgorithmType::HelixV1).unwrap();

        let (share_tx, share_rx) = unbounded();
        let (hash_tx, hash_rx) = unbounded();

        let scheduler = Scheduler::new(share_tx, 16, 1);
        scheduler.start(algorithm, hash_tx);

        // Non-positive difficulty degenerates to the easiest target, so
        // the very first scanned nonce is a share.
        scheduler.update_job(MiningJob {
            job_id: "easy".into(),
            header: vec![0u8; 80],
            difficulty: 0.0,
            start_nonce: 0,
            algorithm: AlgorithmType::HelixV1,
        });

        let share = share_rx
            .recv_timeout(Duration::from_secs(30))
            .expect("no share within timeout");
        assert_eq!(share.job_id, "easy");

        // Hash counts flow to the stats channel as batches finish.
        let counted = hash_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("no hash count within timeout");
        assert!(counted >= 1);

        scheduler.stop();
    }
}
