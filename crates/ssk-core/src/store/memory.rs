//! In-memory ratchet store.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use ssk_crypto::RatchetState;

use super::{Generation, RatchetStore, StoreError, decode_state, encode_state};
use crate::ids::{GroupId, SenderId};

type RecordKey = (Generation, GroupId, SenderId);

/// In-memory ratchet store for tests, simulation and ephemeral hosts.
///
/// Records are kept CBOR-encoded, exactly as the durable store writes them,
/// so decoding invariants are exercised on every load. Clones share the
/// same map through `Arc<Mutex<_>>`. Each call is atomic on its own, so the
/// transaction type is `()`.
#[derive(Clone, Default)]
pub struct MemoryRatchetStore {
    records: Arc<Mutex<HashMap<RecordKey, Vec<u8>>>>,
}

impl MemoryRatchetStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across both generations.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    /// True when nothing has been stored.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<RecordKey, Vec<u8>>>, StoreError> {
        self.records.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl RatchetStore for MemoryRatchetStore {
    type Transaction = ();

    fn load(
        &self,
        _tx: &mut (),
        group: &GroupId,
        sender: &SenderId,
        generation: Generation,
    ) -> Result<Option<RatchetState>, StoreError> {
        let records = self.lock()?;

        records
            .get(&(generation, group.clone(), sender.clone()))
            .map(|bytes| decode_state(bytes.as_slice()))
            .transpose()
    }

    fn save(
        &self,
        _tx: &mut (),
        group: &GroupId,
        sender: &SenderId,
        generation: Generation,
        state: &RatchetState,
    ) -> Result<(), StoreError> {
        let bytes = encode_state(state)?;
        self.lock()?.insert((generation, group.clone(), sender.clone()), bytes);

        Ok(())
    }
}
