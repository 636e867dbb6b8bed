//! Fuzz target for message blob decryption
//!
//! Feeds arbitrary blobs and candidate key sets to `decrypt_message`.
//!
//! # Strategy
//!
//! - Raw blobs of any length (shorter than, equal to, longer than nonce+tag)
//! - Candidate sets from empty up to the window size
//! - Valid blobs sealed under one candidate, then mutated
//!
//! # Invariants
//!
//! - Decryption never panics, whatever the blob
//! - Blobs shorter than nonce + tag are always rejected
//! - A blob sealed under any candidate decrypts to the original plaintext
//! - Any single-bit mutation of a valid blob is rejected

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ssk_crypto::{
    MAX_CANDIDATE_KEYS, MessageKey, NONCE_SIZE, TAG_SIZE, decrypt_message, encrypt_message,
};

#[derive(Debug, Clone, Arbitrary)]
struct CipherScenario {
    /// Candidate key material
    keys: Vec<[u8; 32]>,
    /// Blob that was never sealed by us
    raw_blob: Vec<u8>,
    /// Plaintext to seal under one of the candidates
    plaintext: Vec<u8>,
    /// Which candidate seals the plaintext
    sealing_key: u8,
    /// Nonce for the sealed blob
    nonce: [u8; NONCE_SIZE],
    /// Bit to flip in the sealed blob
    flip_bit: u16,
}

fuzz_target!(|scenario: CipherScenario| {
    let candidates: Vec<MessageKey> = scenario
        .keys
        .iter()
        .take(MAX_CANDIDATE_KEYS)
        .map(|bytes| MessageKey::from_bytes(*bytes))
        .collect();

    // INVARIANT 1: Arbitrary input never panics
    let result = decrypt_message(&scenario.raw_blob, &candidates);

    // INVARIANT 2: Truncated blobs are rejected
    if scenario.raw_blob.len() < NONCE_SIZE + TAG_SIZE {
        assert!(result.is_err(), "blob shorter than nonce + tag must be rejected");
    }

    if candidates.is_empty() {
        assert!(result.is_err(), "no candidates means no plaintext");
        return;
    }

    let sealer = &candidates[scenario.sealing_key as usize % candidates.len()];
    let blob = encrypt_message(&scenario.plaintext, sealer, scenario.nonce);
    assert_eq!(blob.len(), NONCE_SIZE + scenario.plaintext.len() + TAG_SIZE);

    // INVARIANT 3: Any candidate position round-trips
    match decrypt_message(&blob, &candidates) {
        Ok(plaintext) => assert_eq!(plaintext, scenario.plaintext),
        Err(e) => panic!("valid blob failed to decrypt: {e}"),
    }

    // INVARIANT 4: Single-bit tampering is detected
    let bit = scenario.flip_bit as usize % (blob.len() * 8);
    let mut tampered = blob;
    tampered[bit / 8] ^= 1 << (bit % 8);
    assert!(decrypt_message(&tampered, &candidates).is_err(), "tampered blob must be rejected");
});
