//! Shared Sender Keys cryptographic primitives
//!
//! Building blocks for closed-group encryption. Every sender in a group
//! owns a hash chain; each message advances the chain by one step and is
//! sealed under the message key that step produced. Everything here is a
//! pure function over values. Persistence and orchestration live in
//! `ssk-core`.
//!
//! # Key Lifecycle
//!
//! ```text
//! Random Root (32 bytes)
//!        │
//!        ▼
//! ChainKey[0] ──HMAC(ck, 0x02)──▶ ChainKey[1] ──▶ ChainKey[2] ──▶ ...
//!        │                            │
//!   HMAC(ck, 0x01)               HMAC(ck, 0x01)
//!        ▼                            ▼
//! MessageKey[0]                 MessageKey[1]
//!        │
//!        ▼
//! AES-256-GCM → nonce ‖ ciphertext ‖ tag
//! ```
//!
//! # Security
//!
//! Forward Secrecy:
//! - Stepping never mutates a [`RatchetState`]; once the previous state is
//!   dropped its chain key is zeroized and cannot be recomputed
//! - Message keys and chain keys come from distinct HMAC inputs, so a leaked
//!   message key reveals neither its chain key nor any sibling key
//!
//! Authenticity:
//! - AES-256-GCM with a 128-bit tag; any modified byte fails authentication
//! - A fresh random 12-byte nonce is drawn for every message
//!
//! Out-of-order tolerance:
//! - Decryption searches a bounded window of the newest message keys
//!   ([`MAX_CANDIDATE_KEYS`]), newest first

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod random;
pub mod sender_keys;

pub use random::{OsRandom, RandomSource};
pub use sender_keys::{
    CHAIN_KEY_CONSTANT, ChainKey, KEY_SIZE, MAX_CANDIDATE_KEYS, MESSAGE_KEY_CONSTANT, MessageKey,
    NONCE_SIZE, RatchetState, SenderKeyError, TAG_SIZE, decrypt_message, encrypt_message,
    encrypt_with, generate_chain_key, kdf,
};
