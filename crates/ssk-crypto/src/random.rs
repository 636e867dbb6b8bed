//! Randomness abstraction for deterministic testing.
//!
//! Root chain keys and AEAD nonces are the only random inputs of the
//! protocol. Routing them through [`RandomSource`] keeps every primitive a
//! pure function of its inputs, so tests can replay exact byte sequences
//! from a seeded generator while production draws from the OS.

/// Source of random bytes for key and nonce generation.
///
/// # Invariants
///
/// - Production implementations MUST use cryptographically secure entropy
/// - Given the same seed, a test implementation produces the same sequence
pub trait RandomSource {
    /// Fills the provided buffer with random bytes.
    fn fill_bytes(&self, buffer: &mut [u8]);

    /// Generates `N` random bytes.
    fn random_array<const N: usize>(&self) -> [u8; N]
    where
        Self: Sized,
    {
        let mut bytes = [0u8; N];
        self.fill_bytes(&mut bytes);
        bytes
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &R {
    fn fill_bytes(&self, buffer: &mut [u8]) {
        (**self).fill_bytes(buffer);
    }
}

/// Operating system randomness via getrandom.
///
/// # Panics
///
/// Panics if the OS RNG fails. A process without working entropy cannot
/// generate chain keys or nonces safely, and continuing would risk nonce
/// reuse under a message key.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    #[allow(clippy::expect_used)]
    fn fill_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - cannot generate keys or nonces");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_random_fills_buffer() {
        let mut bytes = [0u8; 64];
        OsRandom.fill_bytes(&mut bytes);

        let non_zero_count = bytes.iter().filter(|&&b| b != 0).count();
        assert!(non_zero_count > 32, "most bytes should be non-zero");
    }

    #[test]
    fn os_random_arrays_differ() {
        let a: [u8; 32] = OsRandom.random_array();
        let b: [u8; 32] = OsRandom.random_array();
        assert_ne!(a, b);
    }

    #[test]
    fn reference_delegates_to_source() {
        struct Fixed;
        impl RandomSource for Fixed {
            fn fill_bytes(&self, buffer: &mut [u8]) {
                buffer.fill(0x5A);
            }
        }

        let source = &Fixed;
        let bytes: [u8; 4] = source.random_array();
        assert_eq!(bytes, [0x5A; 4]);
    }
}
