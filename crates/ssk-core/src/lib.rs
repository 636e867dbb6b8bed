//! Shared Sender Keys protocol core
//!
//! Stateful side of closed-group encryption: persisting each sender's
//! ratchet, stepping it for outgoing messages, catching it up (or reading
//! back older keys) for incoming ones, and asking peers to redistribute
//! their sender key when local state cannot be recovered.
//!
//! # Architecture
//!
//! ```text
//!            SharedSenderKeys (encrypt / decrypt / rotate / install)
//!                    │
//!                    ▼
//!             RatchetController ──────────▶ ResyncNotifier
//!                    │                       (request_sender_key)
//!          ┌─────────┴──────────┐
//!          ▼                    ▼
//!    RatchetStore          ssk-crypto
//!  (Current / Old)   (RatchetState::step, AES-256-GCM)
//! ```
//!
//! Cryptography never touches storage directly: the controller loads a
//! state, derives the next one, and saves it back through the store.
//!
//! # Generations
//!
//! Each `(group, sender)` pair has two slots. `Current` is the live chain;
//! `Old` is a frozen copy kept across a key rotation so messages sealed
//! under the previous chain still decrypt. Decryption tries `Current` and
//! falls back to `Old` exactly once.
//!
//! # Concurrency
//!
//! Everything is synchronous and lock-free. Hosts must serialize operations
//! on the same `(group, sender)` pair and provide atomicity of one
//! load+save cycle through the store's transaction.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod controller;
pub mod error;
pub mod ids;
pub mod resync;
pub mod sender_keys;
pub mod store;

pub use config::SenderKeysConfig;
pub use controller::{LARGE_CATCH_UP, RatchetController};
pub use error::RatchetError;
pub use ids::{GroupId, SenderId};
pub use resync::{ChannelResyncNotifier, RecordingResyncNotifier, ResyncNotifier, ResyncRequest};
pub use sender_keys::SharedSenderKeys;
pub use store::{
    ChaoticRatchetStore, Generation, MemoryRatchetStore, RatchetStore, RedbRatchetStore,
    StoreError,
};
