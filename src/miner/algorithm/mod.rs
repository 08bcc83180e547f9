// src/miner/algorithm/mod.rs
//! Mining algorithm implementations
//!
//! This module contains the supported chained-hash algorithms and their
//! common dispatch interface. Currently implements:
//! - Helix v2 (current seven-stage chain)
//! - Helix v1 (legacy five-stage chain)

/// Helix algorithm family implementation
///
/// Both chain variants live here; they share the primitive pool, the
/// per-thread scratch matrix and the mixing stage, and differ in stage
/// order, matrix geometry and difficulty scaling.
pub mod helix;

use crate::miner::context::{PREFIX_BYTES, ThreadContext};
use crate::miner::features::CpuFeature;
use crate::miner::work::{
    HEADER_BYTES, NONCE_WORD, RestartFlag, ScanOutcome, Target, Work, benchmark_mode,
};
use crate::types::AlgorithmType;
use crate::utils::error::MinerError;

/// Common interface for all mining algorithms
///
/// One trait object per algorithm bundles everything the generic driver
/// needs: thread-local setup, the hash pipeline, the difficulty scaling
/// rule and the declared fast-path hardware features. The driver resolves
/// a single handle from the registry at startup and holds it for the
/// lifetime of the process; nothing is looked up per call.
pub trait Algorithm: Send + Sync {
    /// The identifier this implementation is registered under
    fn algorithm_type(&self) -> AlgorithmType;

    /// Hardware capabilities the fast-path kernel assumes
    ///
    /// Purely declarative; implementations must fall back to a scalar
    /// kernel with identical output when something is missing.
    fn required_features(&self) -> &'static [CpuFeature];

    /// Creates the per-thread context for this algorithm
    ///
    /// Called once per worker thread before its first scan; allocates the
    /// zero-filled scratch matrix with this algorithm's geometry.
    ///
    /// # Errors
    /// [`MinerError::ScratchError`] when the allocation is refused. The
    /// caller must not scan with this thread.
    fn thread_init(&self) -> Result<ThreadContext, MinerError>;

    /// Runs the full hash pipeline over one 80-byte header
    ///
    /// Reads the primitive templates and the thread's cached midstate,
    /// and mutates only the thread's scratch matrix. The caller must have
    /// refreshed the midstate for the header's 64-byte prefix beforehand;
    /// the scan driver below does this once per call.
    fn hash(&self, ctx: &mut ThreadContext, header: &[u8; HEADER_BYTES]) -> [u8; 32];

    /// Converts an external difficulty value into this algorithm's target
    ///
    /// Pure and monotonic: higher difficulty always yields a smaller
    /// target.
    fn scale_target(&self, difficulty: f64) -> Target;

    /// Scans nonces upward from the template's current nonce
    ///
    /// The provided implementation is the shared driver used by every
    /// algorithm:
    /// - serializes the header with normalized byte order once,
    /// - refreshes the thread's midstate once,
    /// - per nonce: polls the restart flag, rewrites the nonce bytes,
    ///   invokes the pipeline, and pre-checks a single digest word
    ///   against the target's most significant word before paying for
    ///   the full comparison.
    ///
    /// All three outcomes are ordinary results. With
    /// `max_nonce == work.nonce()` the loop body never runs and no
    /// pipeline invocation happens. The winning (or next unscanned)
    /// nonce is written back into the template.
    fn scan(
        &self,
        ctx: &mut ThreadContext,
        work: &mut Work,
        max_nonce: u32,
        restart: &RestartFlag,
    ) -> ScanOutcome {
        let target = if benchmark_mode() {
            work.target.relaxed_for_benchmark()
        } else {
            work.target
        };
        let htarg = target.word(7);

        let mut header = work.encode_header();
        let prefix: [u8; PREFIX_BYTES] = header[..PREFIX_BYTES]
            .try_into()
            .expect("64-byte prefix");
        ctx.refresh_midstate(&prefix);

        let mut nonce = work.nonce();
        let mut hashes_done: u64 = 0;

        while nonce < max_nonce {
            if restart.is_set() {
                work.set_nonce(nonce);
                return ScanOutcome::Restarted { hashes_done };
            }

            header[NONCE_WORD * 4..].copy_from_slice(&nonce.to_be_bytes());
            let hash = self.hash(ctx, &header);
            hashes_done += 1;

            let word7 = u32::from_le_bytes(hash[28..32].try_into().expect("4-byte word"));
            if word7 <= htarg && target.meets(&hash) {
                work.set_nonce(nonce);
                return ScanOutcome::Found {
                    nonce,
                    hash,
                    hashes_done,
                };
            }
            nonce += 1;
        }

        work.set_nonce(nonce);
        ScanOutcome::Exhausted { hashes_done }
    }
}

#[cfg(test)]
mod tests {
    use super::helix::HelixAlgo;
    use super::*;
    use crate::miner::features::CpuFeatures;
    use crate::miner::work::HEADER_WORDS;

    fn scalar_v1() -> HelixAlgo {
        HelixAlgo::new(AlgorithmType::HelixV1, &CpuFeatures::default())
    }

    fn zero_work(target: Target) -> Work {
        Work::new("test", [0u32; HEADER_WORDS], target)
    }

    #[test]
    fn easiest_target_matches_on_first_nonce() {
        let algo = scalar_v1();
        let mut ctx = algo.thread_init().unwrap();
        let mut work = zero_work(Target::MAX);
        let restart = RestartFlag::new();

        let outcome = algo.scan(&mut ctx, &mut work, 1000, &restart);
        match outcome {
            ScanOutcome::Found {
                nonce,
                hash,
                hashes_done,
            } => {
                assert_eq!(nonce, 0);
                assert_eq!(hashes_done, 1);
                assert!(work.target.meets(&hash));
                assert_eq!(work.nonce(), 0);
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn empty_window_does_no_work() {
        let algo = scalar_v1();
        let mut ctx = algo.thread_init().unwrap();
        let mut work = zero_work(Target::MAX);
        work.set_nonce(42);
        let restart = RestartFlag::new();

        // max_nonce equals the first nonce: zero pipeline invocations.
        let outcome = algo.scan(&mut ctx, &mut work, 42, &restart);
        assert_eq!(outcome, ScanOutcome::Exhausted { hashes_done: 0 });
        assert_eq!(work.nonce(), 42);
    }

    #[test]
    fn exhaustion_attempts_exactly_the_window() {
        let algo = scalar_v1();
        let mut ctx = algo.thread_init().unwrap();
        let mut work = zero_work(Target::ZERO);
        work.set_nonce(10);
        let restart = RestartFlag::new();

        let outcome = algo.scan(&mut ctx, &mut work, 15, &restart);
        assert_eq!(outcome, ScanOutcome::Exhausted { hashes_done: 5 });
        assert_eq!(work.nonce(), 15);
    }

    #[test]
    fn preset_restart_flag_stops_before_hashing() {
        let algo = scalar_v1();
        let mut ctx = algo.thread_init().unwrap();
        let mut work = zero_work(Target::MAX);
        let restart = RestartFlag::new();
        restart.set();

        let outcome = algo.scan(&mut ctx, &mut work, 1000, &restart);
        assert_eq!(outcome, ScanOutcome::Restarted { hashes_done: 0 });
    }

    #[test]
    fn found_solutions_always_pass_the_full_comparison() {
        // The fast-path word check may only ever add false positives,
        // which the full comparison then rejects; anything reported as
        // Found must satisfy the full comparison.
        let algo = scalar_v1();
        let mut ctx = algo.thread_init().unwrap();

        let mut words = [0u32; 8];
        words[7] = u32::MAX;
        words[6] = u32::MAX;
        let mut work = zero_work(Target::from_words(words));
        let restart = RestartFlag::new();

        if let ScanOutcome::Found { hash, .. } = algo.scan(&mut ctx, &mut work, 64, &restart) {
            assert!(work.target.meets(&hash));
        }
    }

    #[test]
    fn reused_context_tracks_prefix_changes() {
        // Scanning a second template with a different invariant prefix on
        // the same thread must refresh the midstate: the digest has to
        // match what a completely fresh context computes.
        let algo = scalar_v1();
        let mut shared_ctx = algo.thread_init().unwrap();
        let restart = RestartFlag::new();

        let mut first = zero_work(Target::MAX);
        let _ = algo.scan(&mut shared_ctx, &mut first, 1, &restart);

        let mut second = Work::new("other", [0x1111_1111u32; HEADER_WORDS], Target::MAX);
        second.set_nonce(0);
        let reused = algo.scan(&mut shared_ctx, &mut second, 1, &restart);

        let mut fresh_ctx = algo.thread_init().unwrap();
        let mut second_again = Work::new("other", [0x1111_1111u32; HEADER_WORDS], Target::MAX);
        second_again.set_nonce(0);
        let fresh = algo.scan(&mut fresh_ctx, &mut second_again, 1, &restart);

        assert_eq!(reused, fresh);
    }
}
