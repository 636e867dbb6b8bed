//! Redb-backed durable ratchet store.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. The
//! host's `WriteTransaction` is the ambient transaction: loads and saves
//! made by one protocol operation become visible together on commit.

use std::{path::Path, sync::Arc};

use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use ssk_crypto::RatchetState;

use super::{Generation, RatchetStore, StoreError, decode_state, encode_state};
use crate::ids::{GroupId, SenderId};

/// Table: ratchets
/// Key: generation tag (1 byte) ‖ group len (4 bytes BE) ‖ group ‖ sender
/// Value: CBOR-encoded `RatchetState`
const RATCHETS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("ratchets");

/// Durable ratchet store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbRatchetStore {
    db: Arc<Database>,
}

impl RedbRatchetStore {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates the RATCHETS table if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref())?;

        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(RATCHETS)?;
        }
        txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction to pass through protocol operations.
    pub fn begin(&self) -> Result<WriteTransaction, StoreError> {
        Ok(self.db.begin_write()?)
    }

    /// Commit a transaction started with [`Self::begin`].
    pub fn commit(&self, tx: WriteTransaction) -> Result<(), StoreError> {
        tx.commit()?;
        Ok(())
    }
}

impl RatchetStore for RedbRatchetStore {
    type Transaction = WriteTransaction;

    fn load(
        &self,
        tx: &mut WriteTransaction,
        group: &GroupId,
        sender: &SenderId,
        generation: Generation,
    ) -> Result<Option<RatchetState>, StoreError> {
        let table = tx.open_table(RATCHETS)?;
        let key = encode_record_key(generation, group, sender);

        let record = table.get(key.as_slice())?;
        record.map(|bytes| decode_state(bytes.value())).transpose()
    }

    fn save(
        &self,
        tx: &mut WriteTransaction,
        group: &GroupId,
        sender: &SenderId,
        generation: Generation,
        state: &RatchetState,
    ) -> Result<(), StoreError> {
        let bytes = encode_state(state)?;
        let key = encode_record_key(generation, group, sender);

        let mut table = tx.open_table(RATCHETS)?;
        table.insert(key.as_slice(), bytes.as_slice())?;

        Ok(())
    }
}

/// Encode a record key. The group is length-prefixed so that distinct
/// `(group, sender)` pairs never collide on concatenation.
fn encode_record_key(generation: Generation, group: &GroupId, sender: &SenderId) -> Vec<u8> {
    let group = group.as_str().as_bytes();
    let sender = sender.as_str().as_bytes();

    let mut key = Vec::with_capacity(1 + 4 + group.len() + sender.len());
    key.push(generation.tag());
    key.extend_from_slice(&(group.len() as u32).to_be_bytes());
    key.extend_from_slice(group);
    key.extend_from_slice(sender);
    key
}

#[cfg(test)]
mod tests {
    use ssk_crypto::ChainKey;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn record_keys_do_not_collide_on_concatenation() {
        let a = encode_record_key(Generation::Current, &GroupId::from("ab"), &SenderId::from("c"));
        let b = encode_record_key(Generation::Current, &GroupId::from("a"), &SenderId::from("bc"));
        assert_ne!(a, b);
    }

    #[test]
    fn record_keys_differ_by_generation() {
        let group = GroupId::from("g");
        let sender = SenderId::from("s");
        assert_ne!(
            encode_record_key(Generation::Current, &group, &sender),
            encode_record_key(Generation::Old, &group, &sender)
        );
    }

    #[test]
    fn committed_state_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ratchets.redb");
        let group = GroupId::from("g1");
        let sender = SenderId::from("alice");
        let state = RatchetState::new(ChainKey::from_bytes([5; 32])).step_to(3);

        {
            let store = RedbRatchetStore::open(&path).unwrap();
            let mut tx = store.begin().unwrap();
            store.save(&mut tx, &group, &sender, Generation::Current, &state).unwrap();
            store.commit(tx).unwrap();
        }

        let store = RedbRatchetStore::open(&path).unwrap();
        let mut tx = store.begin().unwrap();
        let loaded = store.load(&mut tx, &group, &sender, Generation::Current).unwrap();

        assert_eq!(loaded, Some(state));
    }

    #[test]
    fn uncommitted_save_is_discarded() {
        let dir = tempdir().unwrap();
        let store = RedbRatchetStore::open(dir.path().join("ratchets.redb")).unwrap();
        let group = GroupId::from("g1");
        let sender = SenderId::from("alice");
        let state = RatchetState::new(ChainKey::from_bytes([6; 32]));

        {
            let mut tx = store.begin().unwrap();
            store.save(&mut tx, &group, &sender, Generation::Current, &state).unwrap();
            // Dropped without commit
        }

        let mut tx = store.begin().unwrap();
        let loaded = store.load(&mut tx, &group, &sender, Generation::Current).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn reads_see_writes_in_same_transaction() {
        let dir = tempdir().unwrap();
        let store = RedbRatchetStore::open(dir.path().join("ratchets.redb")).unwrap();
        let group = GroupId::from("g1");
        let sender = SenderId::from("bob");
        let state = RatchetState::new(ChainKey::from_bytes([7; 32])).step();

        let mut tx = store.begin().unwrap();
        store.save(&mut tx, &group, &sender, Generation::Old, &state).unwrap();

        let loaded = store.load(&mut tx, &group, &sender, Generation::Old).unwrap();
        assert_eq!(loaded, Some(state));
        assert!(store.load(&mut tx, &group, &sender, Generation::Current).unwrap().is_none());
    }
}
