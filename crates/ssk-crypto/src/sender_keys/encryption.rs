//! Message encryption using AES-256-GCM
//!
//! [`encrypt_message`] and [`decrypt_message`] are pure: the nonce is an
//! input. [`encrypt_with`] draws the nonce from a [`RandomSource`].
//!
//! Wire format:
//!
//! ```text
//! [12 bytes: nonce][N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! The key index travels out of band in the message envelope.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};

use super::{error::SenderKeyError, ratchet::MessageKey};
use crate::random::RandomSource;

/// AES-GCM nonce size (12 bytes)
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Maximum number of recent message keys searched when decrypting.
///
/// Bounds the trial-decryption cost for badly out-of-order messages while
/// still tolerating realistic reordering.
pub const MAX_CANDIDATE_KEYS: usize = 16;

/// Encrypt `plaintext` under `message_key` with the given nonce.
///
/// Returns `nonce ‖ ciphertext ‖ tag`.
///
/// # Security
///
/// A nonce MUST never repeat under the same message key. Message keys are
/// single-use, and [`encrypt_with`] draws a fresh random nonce per call.
pub fn encrypt_message(
    plaintext: &[u8],
    message_key: &MessageKey,
    nonce: [u8; NONCE_SIZE],
) -> Vec<u8> {
    let cipher = Aes256Gcm::new(message_key.as_bytes().into());

    let Ok(ciphertext) = cipher.encrypt(Nonce::from_slice(&nonce), plaintext) else {
        unreachable!("AES-256-GCM encryption cannot fail with valid inputs");
    };

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    blob
}

/// Encrypt with a fresh nonce drawn from `rng`.
pub fn encrypt_with(plaintext: &[u8], message_key: &MessageKey, rng: &impl RandomSource) -> Vec<u8> {
    encrypt_message(plaintext, message_key, rng.random_array())
}

/// Decrypt a `nonce ‖ ciphertext ‖ tag` blob.
///
/// Tries `candidates` in reverse order (most recently derived first) and
/// returns the plaintext from the first key that authenticates. Callers
/// bound `candidates`, normally to the newest [`MAX_CANDIDATE_KEYS`] keys.
///
/// # Errors
///
/// - `DecryptionFailed`: blob shorter than nonce + tag, or no candidate
///   authenticated (tampered, wrong chain, or key outside the window)
pub fn decrypt_message(blob: &[u8], candidates: &[MessageKey]) -> Result<Vec<u8>, SenderKeyError> {
    if blob.len() < NONCE_SIZE + TAG_SIZE {
        return Err(SenderKeyError::DecryptionFailed {
            reason: format!("ciphertext too short: {} bytes", blob.len()),
        });
    }

    let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce);

    candidates
        .iter()
        .rev()
        .find_map(|key| Aes256Gcm::new(key.as_bytes().into()).decrypt(nonce, ciphertext).ok())
        .ok_or_else(|| SenderKeyError::DecryptionFailed {
            reason: format!("authentication failed for all {} candidate keys", candidates.len()),
        })
}

#[cfg(test)]
mod tests {
    use super::{
        super::ratchet::{ChainKey, RatchetState},
        *,
    };

    fn test_state(steps: u64) -> RatchetState {
        let mut seed = [0u8; 32];
        for (i, byte) in seed.iter_mut().enumerate() {
            *byte = (i as u8).wrapping_mul(7);
        }
        RatchetState::new(ChainKey::from_bytes(seed)).step_to(steps)
    }

    fn test_message_key() -> MessageKey {
        MessageKey::from_bytes([0x42; 32])
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = test_message_key();
        let plaintext = b"Hello, World!";

        let blob = encrypt_message(plaintext, &key, [0xAB; NONCE_SIZE]);
        let decrypted = decrypt_message(&blob, std::slice::from_ref(&key)).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn encrypt_decrypt_empty_message() {
        let key = test_message_key();

        let blob = encrypt_message(b"", &key, [0x00; NONCE_SIZE]);
        let decrypted = decrypt_message(&blob, std::slice::from_ref(&key)).unwrap();

        assert!(decrypted.is_empty());
    }

    #[test]
    fn encrypt_decrypt_large_message() {
        let key = test_message_key();
        let plaintext = vec![0x42u8; 64 * 1024]; // 64KB

        let blob = encrypt_message(&plaintext, &key, [0xFF; NONCE_SIZE]);
        let decrypted = decrypt_message(&blob, std::slice::from_ref(&key)).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn blob_layout_is_nonce_ciphertext_tag() {
        let key = test_message_key();
        let plaintext = b"test message";
        let nonce = [0x07; NONCE_SIZE];

        let blob = encrypt_message(plaintext, &key, nonce);

        assert_eq!(&blob[..NONCE_SIZE], &nonce);
        assert_eq!(blob.len(), NONCE_SIZE + plaintext.len() + TAG_SIZE);
    }

    #[test]
    fn different_nonces_produce_different_blobs() {
        let key = test_message_key();

        let blob1 = encrypt_message(b"test", &key, [0x00; NONCE_SIZE]);
        let blob2 = encrypt_message(b"test", &key, [0xFF; NONCE_SIZE]);

        assert_ne!(blob1[NONCE_SIZE..], blob2[NONCE_SIZE..]);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let blob = encrypt_message(b"secret message", &test_message_key(), [0x00; NONCE_SIZE]);
        let wrong_key = MessageKey::from_bytes([0x43; 32]);

        let result = decrypt_message(&blob, &[wrong_key]);

        assert!(matches!(
            result,
            Err(SenderKeyError::DecryptionFailed { reason })
                if reason.contains("authentication")
        ));
    }

    #[test]
    fn tampered_blob_fails_decryption() {
        let key = test_message_key();
        let blob = encrypt_message(b"original message", &key, [0x00; NONCE_SIZE]);

        for index in [0, NONCE_SIZE, blob.len() - 1] {
            let mut tampered = blob.clone();
            tampered[index] ^= 0x01;

            let result = decrypt_message(&tampered, std::slice::from_ref(&key));
            assert!(result.is_err(), "flipping byte {index} must fail authentication");
        }
    }

    #[test]
    fn short_blob_fails_decryption() {
        let key = test_message_key();
        let result = decrypt_message(&[0u8; NONCE_SIZE + TAG_SIZE - 1], &[key]);

        assert!(matches!(
            result,
            Err(SenderKeyError::DecryptionFailed { reason }) if reason.contains("too short")
        ));
    }

    #[test]
    fn empty_candidate_list_fails() {
        let blob = encrypt_message(b"hello", &test_message_key(), [0x00; NONCE_SIZE]);
        assert!(decrypt_message(&blob, &[]).is_err());
    }

    #[test]
    fn decrypt_searches_whole_candidate_list() {
        let state = test_state(5);
        let oldest = &state.message_keys()[0];

        let blob = encrypt_message(b"early", oldest, [0x01; NONCE_SIZE]);
        let decrypted = decrypt_message(&blob, state.message_keys()).unwrap();

        assert_eq!(decrypted, b"early");
    }

    #[test]
    fn key_outside_candidate_window_fails() {
        let state = test_state(MAX_CANDIDATE_KEYS as u64 + 4);
        let evicted = &state.message_keys()[0];

        let blob = encrypt_message(b"too old", evicted, [0x01; NONCE_SIZE]);
        let result = decrypt_message(&blob, state.candidate_keys(MAX_CANDIDATE_KEYS));

        assert!(result.is_err());
    }

    #[test]
    fn encrypt_with_draws_nonce_from_source() {
        struct Fixed;
        impl RandomSource for Fixed {
            fn fill_bytes(&self, buffer: &mut [u8]) {
                buffer.fill(0x33);
            }
        }

        let blob = encrypt_with(b"hi", &test_message_key(), &Fixed);
        assert_eq!(&blob[..NONCE_SIZE], &[0x33; NONCE_SIZE]);
    }
}
