//! CBOR encoding of ratchet records shared by the persistent stores.

use ssk_crypto::RatchetState;

use super::StoreError;

/// Encode a ratchet state as CBOR.
pub fn encode_state(state: &RatchetState) -> Result<Vec<u8>, StoreError> {
    let mut bytes = Vec::with_capacity(64 + 34 * state.message_keys().len());
    ciborium::into_writer(state, &mut bytes)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(bytes)
}

/// Decode a CBOR ratchet state, enforcing its history invariant.
pub fn decode_state(bytes: &[u8]) -> Result<RatchetState, StoreError> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}
