//! Ratchet persistence abstraction
//!
//! One trait covers both logical generations of a sender's ratchet: the
//! live `Current` chain and the frozen `Old` copy retained across a key
//! rotation. The trait is synchronous; calls run inside a caller-supplied
//! transaction that this crate threads through without interpreting.

mod chaotic;
mod codec;
mod error;
mod memory;
mod redb;

use std::fmt;

pub use chaotic::ChaoticRatchetStore;
pub use codec::{decode_state, encode_state};
pub use error::StoreError;
pub use memory::MemoryRatchetStore;
use serde::{Deserialize, Serialize};
use ssk_crypto::RatchetState;

pub use self::redb::RedbRatchetStore;
use crate::ids::{GroupId, SenderId};

/// Storage slot holding a sender's ratchet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Generation {
    /// Frozen chain from before the last key rotation
    Old,
    /// Live chain
    Current,
}

impl Generation {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Old => "old",
            Self::Current => "current",
        }
    }

    /// One-byte tag used in persistent keys.
    pub fn tag(self) -> u8 {
        match self {
            Self::Old => 0x00,
            Self::Current => 0x01,
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load/save ratchet state per `(group, sender, generation)`.
///
/// # Transactions
///
/// `Transaction` is the ambient context the host runs the call in (a
/// database write transaction, or `()` for stores with per-call
/// atomicity). The controller performs at most one load+save cycle per
/// generation attempt, and the host must serialize operations on the same
/// `(group, sender)` pair; this trait provides no locking of its own.
///
/// # Errors
///
/// Returns `StoreError` when the backend fails or a record cannot be
/// decoded. A missing record is `Ok(None)`, not an error.
pub trait RatchetStore {
    /// Host transaction type passed through every call.
    type Transaction;

    /// Load the state stored in `generation`, if any.
    fn load(
        &self,
        tx: &mut Self::Transaction,
        group: &GroupId,
        sender: &SenderId,
        generation: Generation,
    ) -> Result<Option<RatchetState>, StoreError>;

    /// Overwrite the state stored in `generation`.
    fn save(
        &self,
        tx: &mut Self::Transaction,
        group: &GroupId,
        sender: &SenderId,
        generation: Generation,
        state: &RatchetState,
    ) -> Result<(), StoreError>;
}
