//! Error types for ratchet orchestration.
//!
//! The protocol taxonomy has three members: `RatchetLoadFailure`,
//! `MessageKeyMissing` and `DecryptionFailed`. Storage failures are kept
//! apart: they say nothing about the ratchet itself and never trigger a
//! resync. Primitive failures (key length, RNG) are fatal and never
//! reach this type.

use thiserror::Error;

use crate::{
    ids::{GroupId, SenderId},
    store::StoreError,
};

/// Errors surfaced by the ratchet controller and the public facade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RatchetError {
    /// No ratchet state stored for this pair in the requested generation
    #[error("no ratchet state for sender {sender} in group {group}")]
    RatchetLoadFailure {
        /// Group the state was requested for
        group: GroupId,
        /// Sender the state was requested for
        sender: SenderId,
    },

    /// State exists but never recorded the requested historical key
    #[error("message key {target_index} missing for sender {sender} in group {group}")]
    MessageKeyMissing {
        /// Requested key index
        target_index: u64,
        /// Group the key was requested for
        group: GroupId,
        /// Sender the key was requested for
        sender: SenderId,
    },

    /// No candidate message key authenticated the ciphertext
    #[error("decryption failed for key index {key_index} from sender {sender} in group {group}")]
    DecryptionFailed {
        /// Key index transmitted with the message
        key_index: u64,
        /// Group the message belongs to
        group: GroupId,
        /// Sender of the message
        sender: SenderId,
    },

    /// The ratchet store failed
    #[error("ratchet store error: {0}")]
    Storage(#[from] StoreError),
}

impl RatchetError {
    /// Returns true if this error asks a peer to redistribute its sender key.
    ///
    /// Only missing or incomplete state can be repaired by a resync.
    pub fn triggers_resync(&self) -> bool {
        matches!(self, Self::RatchetLoadFailure { .. } | Self::MessageKeyMissing { .. })
    }

    /// Returns true if the message may succeed later without intervention on
    /// the message itself (after a resync, or once storage recovers).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::RatchetLoadFailure { .. } | Self::MessageKeyMissing { .. } => true,
            Self::Storage(_) => true,
            Self::DecryptionFailed { .. } => false,
        }
    }

    /// Returns true for protocol-level failures that participate in the
    /// `Current` then `Old` generation fallback.
    pub(crate) fn is_protocol(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}
