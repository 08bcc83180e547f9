// src/miner/registry.rs
//! Algorithm dispatch registry
//!
//! Associates every [`AlgorithmType`] with the trait object implementing
//! it. Registration happens once at startup, before any worker thread is
//! spawned; afterwards the driver resolves a single `Arc<dyn Algorithm>`
//! handle and holds it for the lifetime of the process, so no lookup ever
//! happens on the hot path. Asking for an identifier that was never
//! registered is a configuration defect and fails startup.

use crate::miner::algorithm::Algorithm;
use crate::miner::algorithm::helix::HelixAlgo;
use crate::miner::features::CpuFeatures;
use crate::types::AlgorithmType;
use crate::utils::error::MinerError;
use std::collections::HashMap;
use std::sync::Arc;

/// Startup-time table of available algorithms
pub struct Registry {
    algorithms: HashMap<AlgorithmType, Arc<dyn Algorithm>>,
}

impl Registry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Registry {
            algorithms: HashMap::new(),
        }
    }

    /// Creates a registry holding every built-in algorithm
    ///
    /// Each algorithm's fast-path feature set is checked against the
    /// probed CPU capabilities; when something is missing the algorithm
    /// is still registered, running on its scalar kernel instead.
    pub fn with_builtins(features: &CpuFeatures) -> Self {
        let mut registry = Registry::new();
        for id in [AlgorithmType::HelixV2, AlgorithmType::HelixV1] {
            let algo = HelixAlgo::new(id, features);
            if features.has_all(algo.required_features()) {
                log::info!("{}: fast-path kernel selected", id);
            } else {
                log::info!("{}: fast-path features unavailable, using scalar kernel", id);
            }
            registry.register(Arc::new(algo));
        }
        registry
    }

    /// Registers an algorithm under its own identifier
    ///
    /// Must be called before any worker thread starts. Registering the
    /// same identifier twice keeps the newer entry.
    pub fn register(&mut self, algorithm: Arc<dyn Algorithm>) {
        let id = algorithm.algorithm_type();
        if self.algorithms.insert(id, algorithm).is_some() {
            log::warn!("algorithm {} registered twice, keeping the newer entry", id);
        }
    }

    /// Looks up the full operation set for an identifier
    ///
    /// # Errors
    /// [`MinerError::AlgorithmError`] when the identifier was never
    /// registered. This is fatal at startup; it cannot occur during
    /// scanning because the driver resolves exactly once.
    pub fn resolve(&self, id: AlgorithmType) -> Result<Arc<dyn Algorithm>, MinerError> {
        self.algorithms
            .get(&id)
            .cloned()
            .ok_or_else(|| MinerError::AlgorithmError(format!("algorithm {} is not registered", id)))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_resolvable() {
        let registry = Registry::with_builtins(&CpuFeatures::default());
        for id in [AlgorithmType::HelixV2, AlgorithmType::HelixV1] {
            let algo = registry.resolve(id).unwrap();
            assert_eq!(algo.algorithm_type(), id);
        }
    }

    #[test]
    fn unregistered_identifier_is_an_error() {
        let registry = Registry::new();
        let err = match registry.resolve(AlgorithmType::HelixV2) {
            Ok(_) => panic!("expected an error for an unregistered algorithm"),
            Err(e) => e,
        };
        assert!(matches!(err, MinerError::AlgorithmError(_)));
    }

    #[test]
    fn resolved_handle_is_reusable() {
        let registry = Registry::with_builtins(&CpuFeatures::default());
        let algo = registry.resolve(AlgorithmType::HelixV1).unwrap();
        // The handle outlives the registry; the driver keeps it for the
        // process lifetime.
        drop(registry);
        let _ctx = algo.thread_init().unwrap();
    }
}
