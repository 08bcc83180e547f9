// src/miner/memhash.rs
//! Memory-hard mixing stage
//!
//! A duplex sponge over a BLAKE2b-style permutation that fills, then
//! randomly revisits, the caller's scratch matrix. The wandering phase
//! picks rows from the evolving sponge state, so computing a digest
//! requires keeping the whole matrix resident; that is the memory-hard
//! property the chain relies on.
//!
//! The matrix is owned by the calling thread and passed in by reference;
//! this module never allocates. Every block the wandering phase reads is
//! written by the setup phase first, so a matrix can be reused across
//! calls without re-zeroing and the result stays deterministic.
//!
//! Two permutation kernels produce bit-identical results: a plain scalar
//! one, and a four-lane one laid out so the compiler can vectorize it on
//! wide-vector targets. Kernel choice is made once at startup from the
//! probed CPU features, never on the hot path.

use crate::miner::context::ScratchMatrix;

/// Sponge rate and matrix block size, in 64-bit words.
pub const BLOCK_WORDS: usize = 8;

const STATE_WORDS: usize = 16;
const FULL_ROUNDS: usize = 12;

/// Domain separation tag absorbed with the input digest.
const DOMAIN_TAG: u64 = 0x68656c_69785f6d78;

/// Fixed lower half of the initial sponge state (BLAKE2b IV).
const IV: [u64; 8] = [
    0x6a09e667f3bcc908,
    0xbb67ae8584caa73b,
    0x3c6ef372fe94f82b,
    0xa54ff53a5f1d36f1,
    0x510e527fade682d1,
    0x9b05688c2b3e6c1f,
    0x1f83d9abfb41bd6b,
    0x5be0cd19137e2179,
];

/// Permutation kernel selected at startup
///
/// Both kernels compute the same permutation; `Wide` arranges the column
/// and diagonal steps as four-lane array operations so that targets with
/// wide vector units can execute them in parallel. Output is identical
/// either way, only throughput differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    /// Straightforward word-at-a-time permutation, always available
    Scalar,
    /// Lane-parallel permutation layout for wide-vector CPUs
    Wide,
}

/// Mixes a 32-byte digest through the scratch matrix in place
///
/// The digest serves as password, salt and output at once: it seeds the
/// sponge together with the matrix geometry and `time_cost`, and is
/// overwritten with the squeezed result. `time_cost` controls how many
/// full wandering sweeps revisit the matrix after the setup fill.
pub fn mix(matrix: &mut ScratchMatrix, digest: &mut [u8; 32], time_cost: u32, kernel: Kernel) {
    let geometry = matrix.geometry();
    let rows = geometry.rows;
    let cols = geometry.cols;

    let mut sponge = Sponge::new(kernel);

    // Seed block: digest words, then the structural parameters. Binding
    // the parameters into the sponge means two geometries can never
    // produce colliding mixes for the same digest.
    let mut seed = [0u64; BLOCK_WORDS];
    for (i, chunk) in digest.chunks_exact(8).enumerate() {
        seed[i] = u64::from_le_bytes(chunk.try_into().expect("8-byte chunk"));
    }
    seed[4] = rows as u64;
    seed[5] = cols as u64;
    seed[6] = time_cost as u64;
    seed[7] = DOMAIN_TAG;
    sponge.inject(&seed);
    sponge.permute(FULL_ROUNDS);

    // Setup: row 0 is squeezed straight out of the sponge, every later
    // row duplexes the previous one. Each block is written before any
    // phase reads it.
    for col in 0..cols {
        *matrix.block_mut(0, col) = sponge.rate();
        sponge.permute(1);
    }
    for row in 1..rows {
        for col in 0..cols {
            let prev = *matrix.block(row - 1, col);
            sponge.inject(&prev);
            sponge.permute(1);
            let mut out = sponge.rate();
            for i in 0..BLOCK_WORDS {
                out[i] ^= prev[i];
            }
            *matrix.block_mut(row, col) = out;
        }
    }

    // Wandering: revisit pseudo-random rows, folding the previously
    // visited row into each one. The row index comes from the live
    // sponge state, so it cannot be predicted without doing the work.
    let mut row_prev = rows - 1;
    for _ in 0..time_cost {
        for _ in 0..rows {
            let row_rand = (sponge.word(0) as usize) % rows;
            for col in 0..cols {
                let a = *matrix.block(row_prev, col);
                let b = *matrix.block(row_rand, col);
                let mut fed = [0u64; BLOCK_WORDS];
                for i in 0..BLOCK_WORDS {
                    fed[i] = a[i].wrapping_add(b[i]);
                }
                sponge.inject(&fed);
                sponge.permute(1);
                let rate = sponge.rate();
                let block = matrix.block_mut(row_rand, col);
                for i in 0..BLOCK_WORDS {
                    block[i] ^= rate[i];
                }
            }
            row_prev = row_rand;
        }
    }

    // Wrap-up: absorb the last visited block and squeeze the result.
    let last = *matrix.block(row_prev, cols - 1);
    sponge.inject(&last);
    sponge.permute(FULL_ROUNDS);
    for (i, chunk) in digest.chunks_exact_mut(8).enumerate() {
        chunk.copy_from_slice(&sponge.word(i).to_le_bytes());
    }
}

/// Duplex sponge state
struct Sponge {
    state: [u64; STATE_WORDS],
    kernel: Kernel,
}

impl Sponge {
    fn new(kernel: Kernel) -> Self {
        let mut state = [0u64; STATE_WORDS];
        state[BLOCK_WORDS..].copy_from_slice(&IV);
        Sponge { state, kernel }
    }

    /// XORs a block into the rate portion of the state
    #[inline]
    fn inject(&mut self, block: &[u64; BLOCK_WORDS]) {
        for i in 0..BLOCK_WORDS {
            self.state[i] ^= block[i];
        }
    }

    /// Copies the rate portion out of the state
    #[inline]
    fn rate(&self) -> [u64; BLOCK_WORDS] {
        let mut out = [0u64; BLOCK_WORDS];
        out.copy_from_slice(&self.state[..BLOCK_WORDS]);
        out
    }

    #[inline]
    fn word(&self, i: usize) -> u64 {
        self.state[i]
    }

    #[inline]
    fn permute(&mut self, rounds: usize) {
        match self.kernel {
            Kernel::Scalar => {
                for _ in 0..rounds {
                    round_scalar(&mut self.state);
                }
            }
            Kernel::Wide => {
                for _ in 0..rounds {
                    round_wide(&mut self.state);
                }
            }
        }
    }
}

/// BLAKE2b quarter-round on four state words
#[inline(always)]
fn g(v: &mut [u64; STATE_WORDS], a: usize, b: usize, c: usize, d: usize) {
    v[a] = v[a].wrapping_add(v[b]);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = v[a].wrapping_add(v[b]);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

/// One permutation round, word at a time
fn round_scalar(v: &mut [u64; STATE_WORDS]) {
    g(v, 0, 4, 8, 12);
    g(v, 1, 5, 9, 13);
    g(v, 2, 6, 10, 14);
    g(v, 3, 7, 11, 15);
    g(v, 0, 5, 10, 15);
    g(v, 1, 6, 11, 12);
    g(v, 2, 7, 8, 13);
    g(v, 3, 4, 9, 14);
}

/// Quarter-round applied to four independent lanes at once
#[inline(always)]
fn g_lanes(a: &mut [u64; 4], b: &mut [u64; 4], c: &mut [u64; 4], d: &mut [u64; 4]) {
    for i in 0..4 {
        a[i] = a[i].wrapping_add(b[i]);
        d[i] = (d[i] ^ a[i]).rotate_right(32);
        c[i] = c[i].wrapping_add(d[i]);
        b[i] = (b[i] ^ c[i]).rotate_right(24);
        a[i] = a[i].wrapping_add(b[i]);
        d[i] = (d[i] ^ a[i]).rotate_right(16);
        c[i] = c[i].wrapping_add(d[i]);
        b[i] = (b[i] ^ c[i]).rotate_right(63);
    }
}

/// One permutation round in lane-parallel form
///
/// The column step maps directly onto four lanes; the diagonal step is
/// the same operation after rotating the b/c/d lanes left by 1/2/3.
fn round_wide(v: &mut [u64; STATE_WORDS]) {
    let mut a = [v[0], v[1], v[2], v[3]];
    let mut b = [v[4], v[5], v[6], v[7]];
    let mut c = [v[8], v[9], v[10], v[11]];
    let mut d = [v[12], v[13], v[14], v[15]];
    g_lanes(&mut a, &mut b, &mut c, &mut d);

    let mut b = [b[1], b[2], b[3], b[0]];
    let mut c = [c[2], c[3], c[0], c[1]];
    let mut d = [d[3], d[0], d[1], d[2]];
    g_lanes(&mut a, &mut b, &mut c, &mut d);

    v[0] = a[0];
    v[1] = a[1];
    v[2] = a[2];
    v[3] = a[3];
    v[4] = b[3];
    v[5] = b[0];
    v[6] = b[1];
    v[7] = b[2];
    v[8] = c[2];
    v[9] = c[3];
    v[10] = c[0];
    v[11] = c[1];
    v[12] = d[1];
    v[13] = d[2];
    v[14] = d[3];
    v[15] = d[0];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::context::MatrixGeometry;

    const TEST_GEOMETRY: MatrixGeometry = MatrixGeometry { rows: 16, cols: 4 };

    fn mixed(input: [u8; 32], time_cost: u32, kernel: Kernel) -> [u8; 32] {
        let mut matrix = ScratchMatrix::allocate(TEST_GEOMETRY).unwrap();
        let mut digest = input;
        mix(&mut matrix, &mut digest, time_cost, kernel);
        digest
    }

    #[test]
    fn mix_is_deterministic() {
        let input = [0x5au8; 32];
        assert_eq!(mixed(input, 1, Kernel::Scalar), mixed(input, 1, Kernel::Scalar));
    }

    #[test]
    fn mix_depends_on_input() {
        let a = mixed([0u8; 32], 1, Kernel::Scalar);
        let b = mixed([1u8; 32], 1, Kernel::Scalar);
        assert_ne!(a, b);
    }

    #[test]
    fn mix_depends_on_time_cost() {
        let input = [7u8; 32];
        assert_ne!(mixed(input, 1, Kernel::Scalar), mixed(input, 2, Kernel::Scalar));
    }

    #[test]
    fn kernels_agree() {
        for seed in 0u8..4 {
            let input = [seed.wrapping_mul(37); 32];
            assert_eq!(
                mixed(input, 1, Kernel::Scalar),
                mixed(input, 1, Kernel::Wide),
                "scalar and wide kernels diverged for seed {}",
                seed
            );
        }
    }

    #[test]
    fn matrix_reuse_is_deterministic() {
        // A second mix with the same input must not see residue from an
        // interleaved mix with a different input.
        let mut matrix = ScratchMatrix::allocate(TEST_GEOMETRY).unwrap();

        let mut first = [0xabu8; 32];
        mix(&mut matrix, &mut first, 1, Kernel::Scalar);

        let mut other = [0xcdu8; 32];
        mix(&mut matrix, &mut other, 1, Kernel::Scalar);

        let mut again = [0xabu8; 32];
        mix(&mut matrix, &mut again, 1, Kernel::Scalar);

        assert_eq!(first, again);
    }
}
