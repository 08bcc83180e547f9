// src/miner/primitives.rs
//! Primitive context pool
//!
//! Holds one initialized-but-unfed hasher per cryptographic primitive used
//! by the Helix pipelines. The pool is created exactly once per process and
//! is never mutated afterwards: callers can only obtain *clones* of the
//! templates, so a template can never be fed bytes directly. Cloning an
//! unfed hasher and feeding it is equivalent to constructing a fresh one
//! and feeding the same bytes, which is what makes the pool safe to share
//! across every worker thread without locking.

use blake2::Blake2s256;
use digest::consts::U32;
use digest::Digest;
use groestl::Groestl256;
use lazy_static::lazy_static;
use sha3::{Keccak256, Sha3_256};
use skein::Skein512;

/// One read-only template per primitive in the Helix chains
///
/// Fields are private on purpose; the only way to use a template is
/// through the cloning accessors below.
pub struct PrimitivePool {
    blake: Blake2s256,
    keccak: Keccak256,
    groestl_a: Groestl256,
    groestl_b: Groestl256,
    skein: Skein512<U32>,
    sha3: Sha3_256,
}

lazy_static! {
    /// Process-wide template set, initialized on first use.
    ///
    /// Initialization is infallible (fixed IVs, no I/O) and happens at
    /// most once; every pipeline invocation afterwards only clones.
    static ref TEMPLATES: PrimitivePool = PrimitivePool::new();
}

/// Returns the process-wide primitive template pool
///
/// The first call performs the one-time initialization; subsequent calls
/// are a plain static reference read.
pub fn templates() -> &'static PrimitivePool {
    &TEMPLATES
}

impl PrimitivePool {
    fn new() -> Self {
        PrimitivePool {
            blake: Blake2s256::new(),
            keccak: Keccak256::new(),
            groestl_a: Groestl256::new(),
            groestl_b: Groestl256::new(),
            skein: Skein512::<U32>::new(),
            sha3: Sha3_256::new(),
        }
    }

    /// Fresh copy of the BLAKE2s-256 template (midstate stage)
    pub fn blake(&self) -> Blake2s256 {
        self.blake.clone()
    }

    /// Fresh copy of the Keccak-256 template
    pub fn keccak(&self) -> Keccak256 {
        self.keccak.clone()
    }

    /// Fresh copy of the first Groestl-256 template
    pub fn groestl_a(&self) -> Groestl256 {
        self.groestl_a.clone()
    }

    /// Fresh copy of the second Groestl-256 template
    pub fn groestl_b(&self) -> Groestl256 {
        self.groestl_b.clone()
    }

    /// Fresh copy of the Skein-512-256 template
    pub fn skein(&self) -> Skein512<U32> {
        self.skein.clone()
    }

    /// Fresh copy of the SHA3-256 template (final stage)
    pub fn sha3(&self) -> Sha3_256 {
        self.sha3.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloned_template_equals_fresh_hasher() {
        let input = b"helix template equivalence";

        let mut from_pool = templates().blake();
        from_pool.update(input);
        let a: [u8; 32] = from_pool.finalize().into();

        let mut fresh = Blake2s256::new();
        fresh.update(input);
        let b: [u8; 32] = fresh.finalize().into();

        assert_eq!(a, b);
    }

    #[test]
    fn templates_are_not_consumed_by_use() {
        let input = b"feed me twice";

        let mut first = templates().keccak();
        first.update(input);
        let a: [u8; 32] = first.finalize().into();

        // A later clone of the same template must behave identically.
        let mut second = templates().keccak();
        second.update(input);
        let b: [u8; 32] = second.finalize().into();

        assert_eq!(a, b);
    }
}
