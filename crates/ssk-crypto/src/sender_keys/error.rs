//! Error types for Sender Keys primitives

use thiserror::Error;

/// Errors from sender key primitives
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SenderKeyError {
    /// No candidate key authenticated the ciphertext, or the blob is too
    /// short to hold a nonce and tag
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// Reason for decryption failure
        reason: String,
    },

    /// Decoded ratchet state violates `message_keys.len() == key_index`
    #[error("invalid ratchet state: key index {key_index} with {history_len} message keys")]
    InvalidRatchetState {
        /// Key index recorded in the state
        key_index: u64,
        /// Number of message keys recorded in the state
        history_len: usize,
    },
}

impl SenderKeyError {
    /// Returns true if this error is fatal (unrecoverable)
    ///
    /// A failed authentication is permanent for that message. A corrupt
    /// stored state can be replaced by a redistributed sender key.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::DecryptionFailed { .. } => true,
            Self::InvalidRatchetState { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decryption_failed_is_fatal() {
        let err = SenderKeyError::DecryptionFailed { reason: "tag mismatch".to_string() };
        assert!(err.is_fatal());
    }

    #[test]
    fn invalid_state_is_not_fatal() {
        let err = SenderKeyError::InvalidRatchetState { key_index: 3, history_len: 1 };
        assert!(!err.is_fatal());
    }

    #[test]
    fn error_display() {
        let err = SenderKeyError::InvalidRatchetState { key_index: 10, history_len: 2 };
        assert_eq!(err.to_string(), "invalid ratchet state: key index 10 with 2 message keys");
    }
}
