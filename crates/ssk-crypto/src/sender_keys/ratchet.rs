//! Ratchet state for one (group, sender) pair
//!
//! # Security Properties
//!
//! - Immutability: stepping returns a new state and never mutates in place
//! - Forward Secrecy: chain keys are zeroized when their state is dropped
//! - History: `message_keys[i]` is the key produced when stepping from
//!   index `i` to `i + 1`, so `message_keys.len() == key_index` always

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::{
    derivation::{CHAIN_KEY_CONSTANT, MESSAGE_KEY_CONSTANT, kdf},
    error::SenderKeyError,
};

/// Size of chain keys and message keys in bytes.
pub const KEY_SIZE: usize = 32;

/// Root secret of the hash chain at one ratchet position.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainKey([u8; KEY_SIZE]);

impl ChainKey {
    /// Wrap raw key material, e.g. a redistributed sender key.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw 32-byte key material.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl Drop for ChainKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for ChainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChainKey(..)")
    }
}

/// Single-use AES-256-GCM key derived from one ratchet step.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageKey([u8; KEY_SIZE]);

impl MessageKey {
    /// Wrap raw key material.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// 32-byte symmetric key for AES-256-GCM.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl Drop for MessageKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MessageKey(..)")
    }
}

/// Immutable snapshot of a sender's ratchet position.
///
/// Created with [`RatchetState::new`] at index 0 and advanced only through
/// [`RatchetState::step`] / [`RatchetState::step_to`], which return new
/// values. Deserialization rejects states whose history length disagrees
/// with the key index.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRatchetState")]
pub struct RatchetState {
    /// Current root of the hash chain
    chain_key: ChainKey,
    /// Number of steps taken since the root
    key_index: u64,
    /// Every message key produced so far, in key index order
    message_keys: Vec<MessageKey>,
}

#[derive(Deserialize)]
struct RawRatchetState {
    chain_key: ChainKey,
    key_index: u64,
    message_keys: Vec<MessageKey>,
}

impl TryFrom<RawRatchetState> for RatchetState {
    type Error = SenderKeyError;

    fn try_from(raw: RawRatchetState) -> Result<Self, Self::Error> {
        if raw.message_keys.len() as u64 != raw.key_index {
            return Err(SenderKeyError::InvalidRatchetState {
                key_index: raw.key_index,
                history_len: raw.message_keys.len(),
            });
        }

        Ok(Self {
            chain_key: raw.chain_key,
            key_index: raw.key_index,
            message_keys: raw.message_keys,
        })
    }
}

impl RatchetState {
    /// Fresh ratchet rooted at `chain_key`: index 0, empty history.
    pub fn new(chain_key: ChainKey) -> Self {
        Self { chain_key, key_index: 0, message_keys: Vec::new() }
    }

    /// Current chain key.
    pub fn chain_key(&self) -> &ChainKey {
        &self.chain_key
    }

    /// Number of steps taken (equals the number of recorded message keys).
    pub fn key_index(&self) -> u64 {
        self.key_index
    }

    /// All recorded message keys, oldest first.
    pub fn message_keys(&self) -> &[MessageKey] {
        &self.message_keys
    }

    /// Message key produced by the most recent step. `None` at index 0.
    pub fn latest_message_key(&self) -> Option<&MessageKey> {
        self.message_keys.last()
    }

    /// Message key produced when stepping from `index` to `index + 1`.
    pub fn message_key(&self, index: u64) -> Option<&MessageKey> {
        usize::try_from(index).ok().and_then(|i| self.message_keys.get(i))
    }

    /// The newest `window` message keys, oldest first.
    pub fn candidate_keys(&self, window: usize) -> &[MessageKey] {
        let start = self.message_keys.len().saturating_sub(window);
        &self.message_keys[start..]
    }

    /// Advance by exactly one step.
    ///
    /// - `message_key = HMAC-SHA256(chain_key, 0x01)`
    /// - `next_chain_key = HMAC-SHA256(chain_key, 0x02)`
    /// - `key_index + 1`, with the message key appended to the history
    pub fn step(&self) -> Self {
        self.clone().into_next()
    }

    /// Advance until `key_index == target`.
    ///
    /// Returns an unchanged copy when `target <= key_index`; a ratchet
    /// never moves backwards.
    pub fn step_to(&self, target: u64) -> Self {
        let mut state = self.clone();
        while state.key_index < target {
            state = state.into_next();
        }
        state
    }

    /// Consume this state and produce its successor. The consumed chain key
    /// is zeroized on drop.
    fn into_next(self) -> Self {
        let Self { chain_key, key_index, mut message_keys } = self;

        message_keys.push(MessageKey(kdf(&chain_key, MESSAGE_KEY_CONSTANT)));
        let next_chain_key = ChainKey(kdf(&chain_key, CHAIN_KEY_CONSTANT));

        Self { chain_key: next_chain_key, key_index: key_index + 1, message_keys }
    }
}

impl fmt::Debug for RatchetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RatchetState")
            .field("key_index", &self.key_index)
            .field("message_keys", &self.message_keys.len())
            .finish_non_exhaustive()
    }
}
