// src/miner/context.rs
//! Per-thread mining context
//!
//! Each worker thread owns exactly one [`ThreadContext`], created by
//! `Algorithm::thread_init` before the thread's first scan and kept for
//! the remainder of the thread's life. It bundles the two pieces of
//! mutable per-thread state the pipeline needs:
//!
//! - the memory-hard scratch matrix, allocated once and reused for every
//!   hash (allocation cost would otherwise dominate the hot loop), and
//! - the cached BLAKE2s midstate for the invariant 64-byte header prefix,
//!   refreshed once per scan call instead of once per nonce.
//!
//! Nothing in here is shared between threads, so the hot path needs no
//! synchronization at all.

use crate::miner::primitives::templates;
use crate::utils::error::MinerError;
use blake2::Blake2s256;
use digest::Digest;

/// Number of bytes in the invariant header prefix covered by the midstate.
pub const PREFIX_BYTES: usize = 64;

/// One 64-byte matrix block, aligned to a cache line.
///
/// The mixing stage reads and writes whole blocks, so keeping each block
/// on its own cache line keeps the random row walk from splitting loads.
#[repr(align(64))]
#[derive(Clone, Copy)]
pub struct MatrixBlock(pub [u64; 8]);

impl MatrixBlock {
    /// All-zero block, the state of every block right after allocation.
    pub const ZERO: MatrixBlock = MatrixBlock([0u64; 8]);
}

/// Structural dimensions of a scratch matrix
///
/// Fixed per algorithm variant; the matrix holds `rows * cols` blocks of
/// 64 bytes each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixGeometry {
    /// Number of rows in the matrix
    pub rows: usize,
    /// Number of 64-byte blocks per row
    pub cols: usize,
}

impl MatrixGeometry {
    /// Total size of a matrix with this geometry, in bytes.
    pub fn size_bytes(&self) -> usize {
        self.rows * self.cols * 64
    }
}

/// Memory-hard scratch workspace owned by a single worker thread
///
/// Allocated zero-filled exactly once per thread and never reallocated,
/// shrunk or freed until the thread exits. The mixing stage overwrites
/// every block it later reads, so reuse across hashes never leaks one
/// nonce's state into the next.
pub struct ScratchMatrix {
    blocks: Vec<MatrixBlock>,
    geometry: MatrixGeometry,
}

impl ScratchMatrix {
    /// Allocates a zero-filled matrix with the given geometry
    ///
    /// # Errors
    /// Returns [`MinerError::ScratchError`] if the allocator refuses the
    /// request. Callers must treat this as unrecoverable for the thread:
    /// the scan loop performs no per-hash error checking and relies on
    /// the matrix existing.
    pub fn allocate(geometry: MatrixGeometry) -> Result<Self, MinerError> {
        let count = geometry.rows * geometry.cols;
        let mut blocks = Vec::new();
        blocks.try_reserve_exact(count).map_err(|e| {
            MinerError::ScratchError(format!(
                "failed to reserve {} bytes of scratch: {}",
                geometry.size_bytes(),
                e
            ))
        })?;
        blocks.resize(count, MatrixBlock::ZERO);

        Ok(ScratchMatrix { blocks, geometry })
    }

    /// Geometry this matrix was allocated with
    pub fn geometry(&self) -> MatrixGeometry {
        self.geometry
    }

    /// Shared view of the block at (row, col)
    #[inline]
    pub fn block(&self, row: usize, col: usize) -> &[u64; 8] {
        &self.blocks[row * self.geometry.cols + col].0
    }

    /// Mutable view of the block at (row, col)
    #[inline]
    pub fn block_mut(&mut self, row: usize, col: usize) -> &mut [u64; 8] {
        &mut self.blocks[row * self.geometry.cols + col].0
    }
}

/// Per-thread state for pipeline invocations
pub struct ThreadContext {
    matrix: ScratchMatrix,
    midstate: Blake2s256,
}

impl ThreadContext {
    /// Creates a context with a freshly allocated scratch matrix
    ///
    /// The midstate starts out as a plain copy of the BLAKE2s template;
    /// the scan loop refreshes it from the actual header prefix before
    /// the first pipeline invocation of every call.
    ///
    /// # Errors
    /// Propagates the scratch allocation failure from
    /// [`ScratchMatrix::allocate`].
    pub fn new(geometry: MatrixGeometry) -> Result<Self, MinerError> {
        Ok(ThreadContext {
            matrix: ScratchMatrix::allocate(geometry)?,
            midstate: templates().blake(),
        })
    }

    /// Recomputes the cached midstate for a new invariant prefix
    ///
    /// Clones the BLAKE2s template and absorbs the 64-byte prefix into the
    /// clone. Called once per scan call (i.e., once per header template),
    /// not once per nonce; every pipeline invocation afterwards clones the
    /// stored state instead of re-absorbing the prefix.
    pub fn refresh_midstate(&mut self, prefix: &[u8; PREFIX_BYTES]) {
        let mut state = templates().blake();
        state.update(prefix);
        self.midstate = state;
    }

    /// Fresh copy of the cached midstate, ready to absorb the suffix
    #[inline]
    pub fn midstate(&self) -> Blake2s256 {
        self.midstate.clone()
    }

    /// Mutable access to the scratch matrix for the mixing stage
    #[inline]
    pub fn matrix_mut(&mut self) -> &mut ScratchMatrix {
        &mut self.matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_size() {
        let g = MatrixGeometry { rows: 16, cols: 4 };
        assert_eq!(g.size_bytes(), 16 * 4 * 64);
    }

    #[test]
    fn matrix_is_zero_filled() {
        let g = MatrixGeometry { rows: 4, cols: 3 };
        let m = ScratchMatrix::allocate(g).unwrap();
        for r in 0..g.rows {
            for c in 0..g.cols {
                assert_eq!(m.block(r, c), &[0u64; 8]);
            }
        }
    }

    #[test]
    fn block_indexing_is_row_major() {
        let g = MatrixGeometry { rows: 2, cols: 2 };
        let mut m = ScratchMatrix::allocate(g).unwrap();
        m.block_mut(1, 0)[0] = 0xdead_beef;
        assert_eq!(m.block(1, 0)[0], 0xdead_beef);
        assert_eq!(m.block(0, 1)[0], 0);
        assert_eq!(m.block(1, 1)[0], 0);
    }

    #[test]
    fn refresh_midstate_tracks_prefix() {
        let g = MatrixGeometry { rows: 2, cols: 2 };
        let mut ctx = ThreadContext::new(g).unwrap();

        let prefix_a = [0x11u8; PREFIX_BYTES];
        let prefix_b = [0x22u8; PREFIX_BYTES];
        let suffix = [0x33u8; 16];

        ctx.refresh_midstate(&prefix_a);
        let mut h = ctx.midstate();
        h.update(&suffix);
        let via_midstate: [u8; 32] = h.finalize().into();

        // Absorbing prefix and suffix in one go must agree with the cached
        // midstate path.
        let mut whole = templates().blake();
        whole.update(&prefix_a);
        whole.update(&suffix);
        let from_scratch: [u8; 32] = whole.finalize().into();
        assert_eq!(via_midstate, from_scratch);

        // A refreshed prefix must change the outcome.
        ctx.refresh_midstate(&prefix_b);
        let mut h = ctx.midstate();
        h.update(&suffix);
        let refreshed: [u8; 32] = h.finalize().into();
        assert_ne!(via_midstate, refreshed);
    }
}
