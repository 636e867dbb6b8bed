//! Ratchet controller: bridges the store and the key derivation.
//!
//! Per `(group, sender)` pair the "position" is whatever state the store
//! holds. Sending moves the `Current` chain forward by one step. Receiving
//! moves a chain forward to the transmitted key index, or reads an older
//! key from the recorded history, first against `Current` and then once
//! against `Old`.
//!
//! # Invariants
//!
//! - States are replaced, never mutated; every advance is saved into the
//!   generation it was loaded from
//! - A stale index never writes to the store
//! - The resync notifier fires at most once per operation, and only after
//!   the `Old` fallback has failed as well
//! - Storage errors abort immediately: they are neither retried against
//!   `Old` nor reported as missing state

use ssk_crypto::{RandomSource, RatchetState, generate_chain_key};

use crate::{
    error::RatchetError,
    ids::{GroupId, SenderId},
    resync::ResyncNotifier,
    store::{Generation, RatchetStore},
};

/// Catch-up distance above which a warning is logged. The key index comes
/// from the message envelope, so a peer controls how far the receiver steps.
pub const LARGE_CATCH_UP: u64 = 1_000;

/// Stateful orchestration of ratchet stepping over a [`RatchetStore`].
///
/// Dependencies are injected; the controller holds no state of its own and
/// takes no locks. Hosts must serialize operations on the same pair.
pub struct RatchetController<'a, S: RatchetStore + ?Sized> {
    store: &'a S,
    notifier: &'a dyn ResyncNotifier,
}

impl<'a, S: RatchetStore + ?Sized> RatchetController<'a, S> {
    /// Create a controller over `store`, reporting unrecoverable state to
    /// `notifier`.
    pub fn new(store: &'a S, notifier: &'a dyn ResyncNotifier) -> Self {
        Self { store, notifier }
    }

    /// Create a fresh ratchet (random chain key, index 0) and save it as
    /// `Current`, replacing whatever was there.
    pub fn generate_ratchet(
        &self,
        tx: &mut S::Transaction,
        group: &GroupId,
        sender: &SenderId,
        rng: &impl RandomSource,
    ) -> Result<RatchetState, RatchetError> {
        let state = RatchetState::new(generate_chain_key(rng));
        self.store.save(tx, group, sender, Generation::Current, &state)?;

        tracing::debug!(%group, %sender, "generated ratchet");
        Ok(state)
    }

    /// Save `state` as `Current`.
    pub fn install(
        &self,
        tx: &mut S::Transaction,
        group: &GroupId,
        sender: &SenderId,
        state: &RatchetState,
    ) -> Result<(), RatchetError> {
        self.store.save(tx, group, sender, Generation::Current, state)?;

        tracing::debug!(%group, %sender, key_index = state.key_index(), "installed ratchet");
        Ok(())
    }

    /// Load the state stored in `generation`, if any.
    pub fn load(
        &self,
        tx: &mut S::Transaction,
        group: &GroupId,
        sender: &SenderId,
        generation: Generation,
    ) -> Result<Option<RatchetState>, RatchetError> {
        Ok(self.store.load(tx, group, sender, generation)?)
    }

    /// Copy the `Current` state into `Old`, freezing it as the fallback
    /// for messages still in flight across a key rotation.
    ///
    /// Returns the archived state, or `None` if there was nothing to archive
    /// (the existing `Old` slot is then left untouched).
    pub fn archive_current(
        &self,
        tx: &mut S::Transaction,
        group: &GroupId,
        sender: &SenderId,
    ) -> Result<Option<RatchetState>, RatchetError> {
        let current = self.store.load(tx, group, sender, Generation::Current)?;

        if let Some(state) = &current {
            self.store.save(tx, group, sender, Generation::Old, state)?;
            tracing::debug!(%group, %sender, key_index = state.key_index(), "archived current ratchet");
        }

        Ok(current)
    }

    /// Advance the `Current` ratchet by one step (send path).
    ///
    /// # Errors
    ///
    /// - `RatchetLoadFailure` if no `Current` state exists; the resync
    ///   notifier is called once before returning
    /// - `Storage` if the store fails
    pub fn step_once(
        &self,
        tx: &mut S::Transaction,
        group: &GroupId,
        sender: &SenderId,
    ) -> Result<RatchetState, RatchetError> {
        let Some(state) = self.store.load(tx, group, sender, Generation::Current)? else {
            let err = RatchetError::RatchetLoadFailure { group: group.clone(), sender: sender.clone() };
            self.request_resync(group, sender, &err);
            return Err(err);
        };

        let next = state.step();
        self.store.save(tx, group, sender, Generation::Current, &next)?;

        tracing::debug!(%group, %sender, key_index = next.key_index(), "stepped ratchet once");
        Ok(next)
    }

    /// Bring the ratchet in `generation` to `target_index` (single attempt,
    /// no fallback, no resync).
    ///
    /// - `target_index < key_index`: the stored state is returned unchanged
    ///   and nothing is written
    /// - otherwise the state is stepped until `key_index == target_index`
    ///   and saved back into `generation` when it moved
    ///
    /// # Errors
    ///
    /// - `RatchetLoadFailure` if `generation` holds no state
    /// - `MessageKeyMissing` if the history is too short for a stale index
    /// - `Storage` if the store fails
    pub fn step_to(
        &self,
        tx: &mut S::Transaction,
        group: &GroupId,
        sender: &SenderId,
        target_index: u64,
        generation: Generation,
    ) -> Result<RatchetState, RatchetError> {
        let state = self.store.load(tx, group, sender, generation)?.ok_or_else(|| {
            RatchetError::RatchetLoadFailure { group: group.clone(), sender: sender.clone() }
        })?;

        if target_index < state.key_index() {
            // Unreachable for decoded states: decoding enforces len == key_index
            if state.message_keys().len() as u64 <= target_index {
                return Err(RatchetError::MessageKeyMissing {
                    target_index,
                    group: group.clone(),
                    sender: sender.clone(),
                });
            }
            return Ok(state);
        }

        if target_index == state.key_index() {
            return Ok(state);
        }

        let from = state.key_index();
        if target_index - from > LARGE_CATCH_UP {
            tracing::warn!(%group, %sender, %generation, from, to = target_index, "large ratchet catch-up");
        }
        let next = state.step_to(target_index);
        self.store.save(tx, group, sender, generation, &next)?;

        tracing::debug!(%group, %sender, %generation, from, to = target_index, "caught up ratchet");
        Ok(next)
    }

    /// Receive path: bring the ratchet to `target_index` and run `attempt`
    /// on the result, first in `Current` and then once in `Old`.
    ///
    /// When both generations fail, the `Old` failure is surfaced, unless
    /// `Old` merely does not exist, in which case the `Current` failure is
    /// the one reported. The resync notifier is called at most once, after
    /// both attempts: when `Current` is missing or incomplete (even if an
    /// archived chain is present), or when an existing `Old` is incomplete.
    /// An absent `Old` alone never triggers a resync.
    pub fn step_to_with_fallback<T>(
        &self,
        tx: &mut S::Transaction,
        group: &GroupId,
        sender: &SenderId,
        target_index: u64,
        mut attempt: impl FnMut(&RatchetState) -> Result<T, RatchetError>,
    ) -> Result<T, RatchetError> {
        let current_err = match self
            .step_to(tx, group, sender, target_index, Generation::Current)
            .and_then(|state| attempt(&state))
        {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_protocol() => return Err(err),
            Err(err) => err,
        };

        tracing::warn!(%group, %sender, target_index, error = %current_err, "retrying against old ratchet");

        let old_err = match self
            .step_to(tx, group, sender, target_index, Generation::Old)
            .and_then(|state| attempt(&state))
        {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_protocol() => return Err(err),
            Err(err) => err,
        };

        // A missing `Old` is the normal state before any rotation
        let old_missing = matches!(old_err, RatchetError::RatchetLoadFailure { .. });
        let needs_resync =
            current_err.triggers_resync() || (!old_missing && old_err.triggers_resync());
        let err = if old_missing { current_err } else { old_err };

        if needs_resync {
            self.request_resync(group, sender, &err);
        }
        Err(err)
    }

    fn request_resync(&self, group: &GroupId, sender: &SenderId, err: &RatchetError) {
        tracing::warn!(%group, %sender, error = %err, "requesting sender key");
        self.notifier.request_sender_key(group, sender);
    }
}
