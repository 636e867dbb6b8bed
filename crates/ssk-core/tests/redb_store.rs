//! End-to-end tests over the durable Redb store
//!
//! Each protocol operation runs inside a host-owned write transaction.
//! Committed steps survive a reopen; aborted ones leave no trace.

use ssk_core::{
    Generation, GroupId, RatchetStore, RecordingResyncNotifier, RedbRatchetStore, SenderId,
    SharedSenderKeys,
};
use ssk_crypto::OsRandom;
use tempfile::tempdir;

#[test]
fn ratchet_position_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ratchets.redb");
    let group = GroupId::from("g1");
    let alice = SenderId::from("alice");
    let notifier = RecordingResyncNotifier::new();

    let (blob, key_index) = {
        let store = RedbRatchetStore::open(&path).unwrap();
        let ssk = SharedSenderKeys::new(&store, &notifier, OsRandom);

        let mut tx = store.begin().unwrap();
        ssk.generate_ratchet(&mut tx, &group, &alice).unwrap();
        ssk.encrypt(&mut tx, b"first", &group, &alice).unwrap();
        let sent = ssk.encrypt(&mut tx, b"second", &group, &alice).unwrap();
        store.commit(tx).unwrap();
        sent
    };
    assert_eq!(key_index, 2);

    let store = RedbRatchetStore::open(&path).unwrap();
    let ssk = SharedSenderKeys::new(&store, &notifier, OsRandom);

    let mut tx = store.begin().unwrap();
    // Replay of the sender's own message reads the key back from history
    let plaintext = ssk.decrypt(&mut tx, &blob, &group, &alice, key_index).unwrap();
    assert_eq!(plaintext, b"second");

    let (_, next_index) = ssk.encrypt(&mut tx, b"third", &group, &alice).unwrap();
    assert_eq!(next_index, 3);
    store.commit(tx).unwrap();
    assert!(notifier.requests().is_empty());
}

#[test]
fn aborted_rotation_keeps_previous_chain() {
    let dir = tempdir().unwrap();
    let store = RedbRatchetStore::open(dir.path().join("ratchets.redb")).unwrap();
    let notifier = RecordingResyncNotifier::new();
    let ssk = SharedSenderKeys::new(&store, &notifier, OsRandom);
    let group = GroupId::from("g1");
    let alice = SenderId::from("alice");

    let mut tx = store.begin().unwrap();
    let original = ssk.generate_ratchet(&mut tx, &group, &alice).unwrap();
    store.commit(tx).unwrap();

    let mut tx = store.begin().unwrap();
    let rotated = ssk.rotate(&mut tx, &group, &alice).unwrap();
    assert_ne!(rotated.chain_key(), original.chain_key());
    drop(tx);

    let mut tx = store.begin().unwrap();
    let current = store.load(&mut tx, &group, &alice, Generation::Current).unwrap();
    let old = store.load(&mut tx, &group, &alice, Generation::Old).unwrap();

    assert_eq!(current, Some(original));
    assert_eq!(old, None);
}

#[test]
fn generations_are_kept_apart_per_pair() {
    let dir = tempdir().unwrap();
    let store = RedbRatchetStore::open(dir.path().join("ratchets.redb")).unwrap();
    let notifier = RecordingResyncNotifier::new();
    let ssk = SharedSenderKeys::new(&store, &notifier, OsRandom);
    let group = GroupId::from("g1");
    let alice = SenderId::from("alice");
    let bob = SenderId::from("bob");

    let mut tx = store.begin().unwrap();
    ssk.generate_ratchet(&mut tx, &group, &alice).unwrap();
    ssk.rotate(&mut tx, &group, &alice).unwrap();
    ssk.encrypt(&mut tx, b"x", &group, &alice).unwrap();
    store.commit(tx).unwrap();

    let mut tx = store.begin().unwrap();
    let current = ssk.current_state(&mut tx, &group, &alice).unwrap().unwrap();
    let old = store.load(&mut tx, &group, &alice, Generation::Old).unwrap().unwrap();

    assert_eq!(current.key_index(), 1);
    assert_eq!(old.key_index(), 0);
    assert_ne!(current.chain_key(), old.chain_key());
    assert!(ssk.current_state(&mut tx, &group, &bob).unwrap().is_none());
}
