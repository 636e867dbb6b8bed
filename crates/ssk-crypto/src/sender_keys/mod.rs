//! Sender Keys: per-sender hash-chain ratchet with AEAD message sealing
//!
//! # Architecture
//!
//! ```text
//! generate_chain_key (random)
//!        │
//!        ▼ RatchetState::new
//! RatchetState { chain_key, key_index: 0, message_keys: [] }
//!        │
//!        ▼ RatchetState::step (HMAC-SHA256, constants 0x01 / 0x02)
//! RatchetState { chain_key', key_index: 1, message_keys: [mk0] }
//!        │
//!        ▼ encrypt_message(mk0)
//! nonce ‖ AES-256-GCM ciphertext ‖ tag
//! ```
//!
//! # Security Properties
//!
//! - Forward Secrecy: stepping yields a new state; the old chain key is
//!   zeroized when the old state is dropped
//! - Key Independence: message key and next chain key use distinct HMAC
//!   inputs
//! - Determinism: the same chain key always yields the same key sequence

pub mod derivation;
pub mod encryption;
pub mod error;
pub mod ratchet;

pub use derivation::{CHAIN_KEY_CONSTANT, MESSAGE_KEY_CONSTANT, generate_chain_key, kdf};
pub use encryption::{
    MAX_CANDIDATE_KEYS, NONCE_SIZE, TAG_SIZE, decrypt_message, encrypt_message, encrypt_with,
};
pub use error::SenderKeyError;
pub use ratchet::{ChainKey, KEY_SIZE, MessageKey, RatchetState};
