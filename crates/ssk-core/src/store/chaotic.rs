//! Chaotic store wrapper for fault injection testing
//!
//! Wraps a ratchet store and randomly fails operations, so tests can check
//! that storage failures abort protocol operations cleanly instead of
//! being mistaken for missing state.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use ssk_crypto::RatchetState;

use super::{Generation, RatchetStore, StoreError};
use crate::ids::{GroupId, SenderId};

/// Chaotic store wrapper that randomly injects failures
///
/// Delegates to an underlying store but fails operations with
/// `StoreError::Io` at the configured rate. The RNG is a seeded LCG so
/// chaos runs are reproducible.
#[derive(Clone)]
pub struct ChaoticRatchetStore<S> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    /// Operation counter for test oracles
    operation_count: Arc<AtomicUsize>,
}

/// Simple deterministic RNG for chaos injection
///
/// Linear congruential generator; fast and reproducible with the same seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate next random value [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S> ChaoticRatchetStore<S> {
    /// Create with explicit seed for reproducible chaos.
    ///
    /// `failure_rate` is clamped to [0.0, 1.0].
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operation_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Underlying store (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total number of store operations attempted.
    pub fn operation_count(&self) -> usize {
        self.operation_count.load(Ordering::Relaxed)
    }

    /// Count the operation and decide whether it fails.
    fn inject(&self) -> Result<(), StoreError> {
        self.operation_count.fetch_add(1, Ordering::Relaxed);

        let roll = self.rng.lock().map_err(|_| StoreError::Poisoned)?.next();
        if roll < self.failure_rate {
            return Err(StoreError::Io("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: RatchetStore> RatchetStore for ChaoticRatchetStore<S> {
    type Transaction = S::Transaction;

    fn load(
        &self,
        tx: &mut S::Transaction,
        group: &GroupId,
        sender: &SenderId,
        generation: Generation,
    ) -> Result<Option<RatchetState>, StoreError> {
        self.inject()?;
        self.inner.load(tx, group, sender, generation)
    }

    fn save(
        &self,
        tx: &mut S::Transaction,
        group: &GroupId,
        sender: &SenderId,
        generation: Generation,
        state: &RatchetState,
    ) -> Result<(), StoreError> {
        self.inject()?;
        self.inner.save(tx, group, sender, generation, state)
    }
}
