//! Protocol configuration.

use ssk_crypto::MAX_CANDIDATE_KEYS;

/// Tunables for the sender keys facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderKeysConfig {
    /// How many of the newest message keys decryption tries.
    ///
    /// Defaults to [`MAX_CANDIDATE_KEYS`].
    pub candidate_window: usize,
}

impl SenderKeysConfig {
    /// Override the candidate window, clamped to `1..=MAX_CANDIDATE_KEYS`:
    /// the newest key is always tried and trial decryption stays bounded.
    #[must_use]
    pub fn with_candidate_window(self, candidate_window: usize) -> Self {
        Self { candidate_window: candidate_window.clamp(1, MAX_CANDIDATE_KEYS) }
    }
}

impl Default for SenderKeysConfig {
    fn default() -> Self {
        Self { candidate_window: MAX_CANDIDATE_KEYS }
    }
}
