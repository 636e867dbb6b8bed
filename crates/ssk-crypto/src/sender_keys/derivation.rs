//! Key derivation for the sender key chain using HMAC-SHA256

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::ratchet::{ChainKey, KEY_SIZE};
use crate::random::RandomSource;

type HmacSha256 = Hmac<Sha256>;

/// HMAC input byte for deriving a message key
pub const MESSAGE_KEY_CONSTANT: u8 = 0x01;

/// HMAC input byte for deriving the next chain key
pub const CHAIN_KEY_CONSTANT: u8 = 0x02;

/// One-way derivation from a chain key: `HMAC-SHA256(chain_key, [constant])`.
///
/// The chain key is the HMAC key and the single distinguishing byte is the
/// message. Distinct constants yield independent outputs.
pub fn kdf(chain_key: &ChainKey, constant: u8) -> [u8; KEY_SIZE] {
    let Ok(mut mac) = HmacSha256::new_from_slice(chain_key.as_bytes()) else {
        unreachable!("HMAC-SHA256 accepts any key size");
    };
    mac.update(&[constant]);
    let result = mac.finalize().into_bytes();

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&result);
    key
}

/// Generate a fresh random root chain key.
pub fn generate_chain_key(rng: &impl RandomSource) -> ChainKey {
    ChainKey::from_bytes(rng.random_array())
}
