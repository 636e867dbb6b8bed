//! Public Shared Sender Keys operations.
//!
//! Wires the controller, the message cipher, a random source and the
//! configuration into the operations the messaging pipeline calls. The
//! wire form is the `nonce ‖ ciphertext ‖ tag` blob plus the key index,
//! which the surrounding envelope transmits.
//!
//! All operations are synchronous and perform storage I/O; call them from a
//! background worker, never from a UI thread.

use ssk_crypto::{ChainKey, RandomSource, RatchetState, decrypt_message, encrypt_with};

use crate::{
    config::SenderKeysConfig,
    controller::RatchetController,
    error::RatchetError,
    ids::{GroupId, SenderId},
    resync::ResyncNotifier,
    store::{Generation, RatchetStore},
};

/// Closed-group encryption for one device.
pub struct SharedSenderKeys<'a, S: RatchetStore + ?Sized, R> {
    controller: RatchetController<'a, S>,
    rng: R,
    config: SenderKeysConfig,
}

impl<'a, S: RatchetStore + ?Sized, R: RandomSource> SharedSenderKeys<'a, S, R> {
    /// Create the facade with the default configuration.
    pub fn new(store: &'a S, notifier: &'a dyn ResyncNotifier, rng: R) -> Self {
        Self::with_config(store, notifier, rng, SenderKeysConfig::default())
    }

    /// Create the facade with an explicit configuration.
    pub fn with_config(
        store: &'a S,
        notifier: &'a dyn ResyncNotifier,
        rng: R,
        config: SenderKeysConfig,
    ) -> Self {
        Self { controller: RatchetController::new(store, notifier), rng, config }
    }

    /// Underlying controller, for hosts that step ratchets directly.
    pub fn controller(&self) -> &RatchetController<'a, S> {
        &self.controller
    }

    /// Active configuration.
    pub fn config(&self) -> SenderKeysConfig {
        self.config
    }

    /// Create and store a fresh `Current` ratchet for `(group, sender)`.
    pub fn generate_ratchet(
        &self,
        tx: &mut S::Transaction,
        group: &GroupId,
        sender: &SenderId,
    ) -> Result<RatchetState, RatchetError> {
        self.controller.generate_ratchet(tx, group, sender, &self.rng)
    }

    /// Encrypt `plaintext` as `sender` in `group`.
    ///
    /// Steps the `Current` ratchet once and seals the plaintext under the
    /// new message key. Returns the blob and the key index to transmit with
    /// it.
    pub fn encrypt(
        &self,
        tx: &mut S::Transaction,
        plaintext: &[u8],
        group: &GroupId,
        sender: &SenderId,
    ) -> Result<(Vec<u8>, u64), RatchetError> {
        let state = self.controller.step_once(tx, group, sender)?;

        let Some(message_key) = state.latest_message_key() else {
            unreachable!("a stepped ratchet always holds a message key");
        };

        let blob = encrypt_with(plaintext, message_key, &self.rng);
        Ok((blob, state.key_index()))
    }

    /// Decrypt a blob sent by `sender` in `group` at `key_index`.
    ///
    /// Tries the `Current` chain and then the `Old` chain, each time
    /// searching the newest `candidate_window` message keys.
    ///
    /// `key_index` is taken from the envelope as is. A far-ahead index makes
    /// the receiver step (and record keys) all the way there; gaps above
    /// [`LARGE_CATCH_UP`](crate::controller::LARGE_CATCH_UP) are logged.
    pub fn decrypt(
        &self,
        tx: &mut S::Transaction,
        blob: &[u8],
        group: &GroupId,
        sender: &SenderId,
        key_index: u64,
    ) -> Result<Vec<u8>, RatchetError> {
        let window = self.config.candidate_window;

        self.controller.step_to_with_fallback(tx, group, sender, key_index, |state| {
            decrypt_message(blob, state.candidate_keys(window)).map_err(|e| {
                tracing::debug!(%group, %sender, key_index, reason = %e, "no candidate key matched");
                RatchetError::DecryptionFailed { key_index, group: group.clone(), sender: sender.clone() }
            })
        })
    }

    /// Rotate `sender`'s own chain: the live chain becomes `Old` and a fresh
    /// `Current` chain is generated. The new chain key is what the host
    /// distributes to the group.
    pub fn rotate(
        &self,
        tx: &mut S::Transaction,
        group: &GroupId,
        sender: &SenderId,
    ) -> Result<RatchetState, RatchetError> {
        self.controller.archive_current(tx, group, sender)?;
        let state = self.controller.generate_ratchet(tx, group, sender, &self.rng)?;

        tracing::info!(%group, %sender, "rotated sender key");
        Ok(state)
    }

    /// Install a chain key redistributed by `sender` (the answer to a
    /// resync request, or a rotation announced by the peer).
    ///
    /// Any live chain is archived as `Old` first so messages sealed before
    /// the rotation still decrypt.
    pub fn install_chain_key(
        &self,
        tx: &mut S::Transaction,
        group: &GroupId,
        sender: &SenderId,
        chain_key: ChainKey,
    ) -> Result<RatchetState, RatchetError> {
        self.controller.archive_current(tx, group, sender)?;

        let state = RatchetState::new(chain_key);
        self.controller.install(tx, group, sender, &state)?;

        tracing::info!(%group, %sender, "installed sender key");
        Ok(state)
    }

    /// The live ratchet for `(group, sender)`, if any.
    pub fn current_state(
        &self,
        tx: &mut S::Transaction,
        group: &GroupId,
        sender: &SenderId,
    ) -> Result<Option<RatchetState>, RatchetError> {
        self.controller.load(tx, group, sender, Generation::Current)
    }
}
