// src/miner/work.rs
//! Work units, targets and scan outcomes
//!
//! A [`Work`] is one header template plus the target its digests are
//! compared against. The header is kept as 20 little-endian `u32` words;
//! the scan loop normalizes byte order once per call when serializing the
//! words into the 80-byte buffer the pipeline consumes, and rewrites only
//! the nonce word afterwards.

use crate::utils::error::MinerError;
use std::sync::atomic::{AtomicBool, Ordering};

/// Header length in 32-bit words.
pub const HEADER_WORDS: usize = 20;
/// Header length in bytes.
pub const HEADER_BYTES: usize = 80;
/// Index of the nonce word inside the header.
pub const NONCE_WORD: usize = 19;

/// Target word substituted by benchmark mode.
///
/// Large enough that roughly one digest in 256 passes the fast-path
/// check, so synthetic runs find matches quickly.
const BENCHMARK_TARGET_WORD: u32 = 0x00ff_ffff;

static BENCHMARK_MODE: AtomicBool = AtomicBool::new(false);

/// Enables or disables process-wide benchmark mode
///
/// While enabled, every scan call substitutes the most significant target
/// word with a relaxed value so matches arrive fast enough to measure
/// throughput. This is a caller-level override; the pipeline itself is
/// unaffected.
pub fn set_benchmark_mode(enabled: bool) {
    BENCHMARK_MODE.store(enabled, Ordering::Relaxed);
}

/// Whether benchmark mode is currently enabled
pub fn benchmark_mode() -> bool {
    BENCHMARK_MODE.load(Ordering::Relaxed)
}

/// 256-bit difficulty threshold in little-endian word order
///
/// Word 7 is the most significant. A digest counts as a solution when,
/// read as a little-endian 256-bit integer, it is less than or equal to
/// the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target([u32; 8]);

impl Target {
    /// The easiest possible target; every digest meets it.
    pub const MAX: Target = Target([u32::MAX; 8]);

    /// The impossible target; only the all-zero digest meets it.
    pub const ZERO: Target = Target([0; 8]);

    /// Builds a target from little-endian words
    pub fn from_words(words: [u32; 8]) -> Self {
        Target(words)
    }

    /// Single word of the target (word 7 is most significant)
    #[inline]
    pub fn word(&self, i: usize) -> u32 {
        self.0[i]
    }

    /// Converts a difficulty value into a target
    ///
    /// Ports the classic `diff_to_target` construction: divide the
    /// maximum target down by the difficulty, placing the 64-bit quotient
    /// at the word position matching the difficulty's magnitude. Higher
    /// difficulty always yields a smaller (harder) target. Non-positive
    /// difficulties degenerate to the easiest target.
    pub fn from_difficulty(difficulty: f64) -> Self {
        if !(difficulty > 0.0) {
            return Target::MAX;
        }

        let mut diff = difficulty;
        let mut k = 6usize;
        while k > 0 && diff > 1.0 {
            diff /= 4294967296.0;
            k -= 1;
        }
        let m = (4294901760.0 / diff) as u64;

        let mut words = [0u32; 8];
        if m == 0 && k == 6 {
            words = [u32::MAX; 8];
        } else {
            words[k] = m as u32;
            words[k + 1] = (m >> 32) as u32;
        }
        Target(words)
    }

    /// Copy of this target with the benchmark relaxation applied
    pub fn relaxed_for_benchmark(&self) -> Self {
        let mut words = self.0;
        words[7] = BENCHMARK_TARGET_WORD;
        Target(words)
    }

    /// Full multi-word comparison of a digest against this target
    ///
    /// Compares word-wise from the most significant word down. Equality
    /// across all words counts as meeting the target.
    pub fn meets(&self, hash: &[u8; 32]) -> bool {
        for (i, chunk) in hash.chunks_exact(4).enumerate().rev() {
            let word = u32::from_le_bytes(chunk.try_into().expect("4-byte chunk"));
            if word > self.0[i] {
                return false;
            }
            if word < self.0[i] {
                return true;
            }
        }
        true
    }
}

/// One header template bound to a target
#[derive(Debug, Clone)]
pub struct Work {
    /// Identifier of the job this template came from
    pub job_id: String,
    /// Header as little-endian words; word 19 is the nonce
    pub data: [u32; HEADER_WORDS],
    /// Threshold digests are compared against
    pub target: Target,
}

impl Work {
    /// Creates a work unit from already-decoded header words
    pub fn new(job_id: impl Into<String>, data: [u32; HEADER_WORDS], target: Target) -> Self {
        Work {
            job_id: job_id.into(),
            data,
            target,
        }
    }

    /// Creates a work unit from a raw 80-byte header blob
    ///
    /// # Errors
    /// Returns [`MinerError::InputError`] when the blob is not exactly
    /// 80 bytes.
    pub fn from_header_bytes(
        job_id: impl Into<String>,
        header: &[u8],
        target: Target,
    ) -> Result<Self, MinerError> {
        if header.len() != HEADER_BYTES {
            return Err(MinerError::InputError(format!(
                "header must be {} bytes, got {}",
                HEADER_BYTES,
                header.len()
            )));
        }

        let mut data = [0u32; HEADER_WORDS];
        for (i, chunk) in header.chunks_exact(4).enumerate() {
            data[i] = u32::from_le_bytes(chunk.try_into().expect("4-byte chunk"));
        }
        Ok(Work::new(job_id, data, target))
    }

    /// Current nonce value (word 19)
    #[inline]
    pub fn nonce(&self) -> u32 {
        self.data[NONCE_WORD]
    }

    /// Overwrites the nonce value (word 19)
    #[inline]
    pub fn set_nonce(&mut self, nonce: u32) {
        self.data[NONCE_WORD] = nonce;
    }

    /// Serializes the header with normalized byte order
    ///
    /// Every word is written big-endian, matching what the pipeline
    /// hashes. Done once per scan call; the per-nonce loop afterwards
    /// only rewrites bytes 76..80.
    pub fn encode_header(&self) -> [u8; HEADER_BYTES] {
        let mut out = [0u8; HEADER_BYTES];
        for (i, word) in self.data.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&word.to_be_bytes());
        }
        out
    }
}

/// Terminal state of one scan call
///
/// All three variants are ordinary outcomes, never errors; the caller
/// decides whether to submit, fetch a new job, or keep going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A nonce met the target
    Found {
        /// The winning nonce
        nonce: u32,
        /// The digest that met the target
        hash: [u8; 32],
        /// Pipeline invocations performed, including the winning one
        hashes_done: u64,
    },
    /// The nonce window was exhausted without a match
    Exhausted {
        /// Pipeline invocations performed
        hashes_done: u64,
    },
    /// The restart flag was raised mid-scan
    Restarted {
        /// Pipeline invocations performed before the flag was noticed
        hashes_done: u64,
    },
}

impl ScanOutcome {
    /// Number of pipeline invocations this scan performed
    pub fn hashes_done(&self) -> u64 {
        match self {
            ScanOutcome::Found { hashes_done, .. }
            | ScanOutcome::Exhausted { hashes_done }
            | ScanOutcome::Restarted { hashes_done } => *hashes_done,
        }
    }

    /// Whether this outcome carries a winning nonce
    pub fn is_found(&self) -> bool {
        matches!(self, ScanOutcome::Found { .. })
    }
}

/// Advisory cancellation flag for one worker slot
///
/// Set by the coordinator when a newer job supersedes the one being
/// scanned; polled by the owning worker at each loop iteration. Release
/// on store and acquire on load are all the ordering the single-writer /
/// single-reader pattern needs. Cancellation is cooperative: an in-flight
/// pipeline invocation always runs to completion.
#[derive(Debug, Default)]
pub struct RestartFlag(AtomicBool);

impl RestartFlag {
    /// Creates a cleared flag
    pub fn new() -> Self {
        RestartFlag(AtomicBool::new(false))
    }

    /// Raises the flag (coordinator side)
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clears the flag (owning worker, when adopting a new job)
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Polls the flag (owning worker, once per scan iteration)
    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn difficulty_one_reference_words() {
        let target = Target::from_difficulty(1.0);
        assert_eq!(target.word(7), 0);
        assert_eq!(target.word(6), 0xffff0000);
        assert_eq!(target.word(0), 0);
    }

    #[test]
    fn target_scaling_is_monotonic() {
        let difficulties = [0.25, 1.0, 2.0, 16.0, 256.0, 65536.0, 4294967296.0 * 4.0];
        let targets: Vec<Target> = difficulties
            .iter()
            .map(|d| Target::from_difficulty(*d))
            .collect();

        for pair in targets.windows(2) {
            // Lower difficulty must produce the larger (easier) target.
            let easier = &pair[0];
            let harder = &pair[1];
            let mut decided = false;
            for i in (0..8).rev() {
                if easier.word(i) != harder.word(i) {
                    assert!(easier.word(i) > harder.word(i));
                    decided = true;
                    break;
                }
            }
            assert!(decided, "targets must differ");
        }
    }

    #[test]
    fn meets_is_inclusive_on_equality() {
        let bytes = hex!("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f");
        let mut words = [0u32; 8];
        for (i, chunk) in bytes.chunks_exact(4).enumerate() {
            words[i] = u32::from_le_bytes(chunk.try_into().unwrap());
        }
        let target = Target::from_words(words);
        assert!(target.meets(&bytes));
    }

    #[test]
    fn meets_orders_by_most_significant_word() {
        let mut words = [0u32; 8];
        words[7] = 0x1000_0000;
        let target = Target::from_words(words);

        // Byte 31 is the most significant byte of word 7.
        let mut below = [0u8; 32];
        below[31] = 0x0f;
        assert!(target.meets(&below));

        let mut above = [0u8; 32];
        above[31] = 0x11;
        assert!(!target.meets(&above));
    }

    #[test]
    fn fast_word_precheck_never_rejects_a_solution() {
        // If the full comparison accepts, the word-7 pre-check must have
        // accepted too; equivalently meets() implies word7 <= target7.
        let mut words = [0u32; 8];
        words[7] = 0x0000_1000;
        words[6] = 0xffff_ffff;
        let target = Target::from_words(words);

        let mut candidates = Vec::new();
        for top in [0u32, 0x0000_0fff, 0x0000_1000, 0x0000_1001, 0xffff_ffff] {
            let mut hash = [0u8; 32];
            hash[28..32].copy_from_slice(&top.to_le_bytes());
            candidates.push(hash);
        }
        for hash in candidates {
            let word7 = u32::from_le_bytes(hash[28..32].try_into().unwrap());
            if target.meets(&hash) {
                assert!(word7 <= target.word(7));
            }
        }
    }

    #[test]
    fn benchmark_relaxation_touches_only_the_top_word() {
        let target = Target::from_difficulty(1000.0);
        let relaxed = target.relaxed_for_benchmark();
        assert_eq!(relaxed.word(7), 0x00ff_ffff);
        for i in 0..7 {
            assert_eq!(relaxed.word(i), target.word(i));
        }
    }

    #[test]
    fn header_round_trip_and_nonce_bytes() {
        let blob: Vec<u8> = (0u8..80).collect();
        let mut work = Work::from_header_bytes("job", &blob, Target::MAX).unwrap();
        work.set_nonce(0x0102_0304);

        let header = work.encode_header();
        // Nonce is serialized big-endian into the last four bytes.
        assert_eq!(&header[76..80], &[0x01, 0x02, 0x03, 0x04]);
        // Prefix words are byte-swapped relative to the little-endian blob.
        assert_eq!(&header[0..4], &[0x03, 0x02, 0x01, 0x00]);
    }

    #[test]
    fn header_blob_length_is_validated() {
        assert!(Work::from_header_bytes("job", &[0u8; 79], Target::MAX).is_err());
        assert!(Work::from_header_bytes("job", &[0u8; 81], Target::MAX).is_err());
        assert!(Work::from_header_bytes("job", &[0u8; 80], Target::MAX).is_ok());
    }

    #[test]
    fn restart_flag_set_and_clear() {
        let flag = RestartFlag::new();
        assert!(!flag.is_set());
        flag.set();
        assert!(flag.is_set());
        flag.clear();
        assert!(!flag.is_set());
    }
}
