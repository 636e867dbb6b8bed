//! Property-based tests for the ratchet controller and facade
//!
//! Properties:
//! - Any delivery order inside the candidate window decrypts every message
//! - Catching up stores the same state as stepping one at a time
//! - Stale indices leave the store untouched
//! - Each unrecoverable receive asks for the sender key exactly once

use std::sync::Mutex;

use proptest::prelude::*;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use ssk_core::{
    Generation, GroupId, MemoryRatchetStore, RatchetController, RatchetError,
    RecordingResyncNotifier, SenderId, SharedSenderKeys,
};
use ssk_crypto::{ChainKey, MAX_CANDIDATE_KEYS, RandomSource, RatchetState};

struct SeededRandom {
    rng: Mutex<ChaCha20Rng>,
}

impl SeededRandom {
    fn new(seed: u64) -> Self {
        Self { rng: Mutex::new(ChaCha20Rng::seed_from_u64(seed)) }
    }
}

impl RandomSource for SeededRandom {
    fn fill_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap().fill_bytes(buffer);
    }
}

fn pair() -> (GroupId, SenderId) {
    (GroupId::from("group"), SenderId::from("sender"))
}

/// Shuffled delivery order for `n` messages.
fn delivery_order(max: usize) -> impl Strategy<Value = Vec<usize>> {
    (1..=max).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
}

proptest! {
    #[test]
    fn prop_any_order_within_window_decrypts(
        order in delivery_order(MAX_CANDIDATE_KEYS),
        seed in any::<u64>(),
    ) {
        let (group, sender) = pair();
        let sender_store = MemoryRatchetStore::new();
        let receiver_store = MemoryRatchetStore::new();
        let notifier = RecordingResyncNotifier::new();
        let alice = SharedSenderKeys::new(&sender_store, &notifier, SeededRandom::new(seed));
        let bob = SharedSenderKeys::new(&receiver_store, &notifier, SeededRandom::new(!seed));

        let root = alice.generate_ratchet(&mut (), &group, &sender).unwrap();
        bob.install_chain_key(&mut (), &group, &sender, root.chain_key().clone()).unwrap();

        let sent: Vec<(Vec<u8>, u64)> = (0..order.len())
            .map(|i| alice.encrypt(&mut (), &i.to_be_bytes(), &group, &sender).unwrap())
            .collect();

        for &i in &order {
            let (blob, key_index) = &sent[i];
            let plaintext = bob.decrypt(&mut (), blob, &group, &sender, *key_index).unwrap();
            prop_assert_eq!(plaintext, i.to_be_bytes().to_vec());
        }

        let stored = bob.current_state(&mut (), &group, &sender).unwrap().unwrap();
        prop_assert_eq!(stored.key_index(), order.len() as u64);
        prop_assert!(notifier.requests().is_empty());
    }

    #[test]
    fn prop_catch_up_matches_sequential(
        key in any::<[u8; 32]>(),
        start in 0u64..20,
        advance in 0u64..40,
    ) {
        let (group, sender) = pair();
        let notifier = RecordingResyncNotifier::new();
        let base = RatchetState::new(ChainKey::from_bytes(key)).step_to(start);

        let skip_store = MemoryRatchetStore::new();
        let skip = RatchetController::new(&skip_store, &notifier);
        skip.install(&mut (), &group, &sender, &base).unwrap();
        let caught_up = skip
            .step_to(&mut (), &group, &sender, start + advance, Generation::Current)
            .unwrap();

        let seq_store = MemoryRatchetStore::new();
        let seq = RatchetController::new(&seq_store, &notifier);
        seq.install(&mut (), &group, &sender, &base).unwrap();
        for _ in 0..advance {
            seq.step_once(&mut (), &group, &sender).unwrap();
        }

        let sequential = seq.load(&mut (), &group, &sender, Generation::Current).unwrap();
        prop_assert_eq!(Some(caught_up.clone()), sequential);
        prop_assert_eq!(caught_up.key_index(), start + advance);
        prop_assert_eq!(caught_up.message_keys().len() as u64, start + advance);
    }

    #[test]
    fn prop_stale_index_never_writes(
        key in any::<[u8; 32]>(),
        ahead in 1u64..30,
        stale_seed in any::<u64>(),
    ) {
        let (group, sender) = pair();
        let store = MemoryRatchetStore::new();
        let notifier = RecordingResyncNotifier::new();
        let controller = RatchetController::new(&store, &notifier);
        let state = RatchetState::new(ChainKey::from_bytes(key)).step_to(ahead);
        controller.install(&mut (), &group, &sender, &state).unwrap();

        let stale = stale_seed % ahead;
        let returned = controller
            .step_to(&mut (), &group, &sender, stale, Generation::Current)
            .unwrap();

        prop_assert_eq!(&returned, &state);
        let stored = controller.load(&mut (), &group, &sender, Generation::Current).unwrap();
        prop_assert_eq!(stored, Some(state));
    }

    #[test]
    fn prop_one_resync_per_unrecoverable_receive(
        indices in prop::collection::vec(0u64..100, 1..10),
    ) {
        let (group, sender) = pair();
        let store = MemoryRatchetStore::new();
        let notifier = RecordingResyncNotifier::new();
        let bob = SharedSenderKeys::new(&store, &notifier, SeededRandom::new(7));

        for (attempt, key_index) in indices.iter().enumerate() {
            let result = bob.decrypt(&mut (), &[0u8; 48], &group, &sender, *key_index);
            let is_load_failure = matches!(result, Err(RatchetError::RatchetLoadFailure { .. }));
            prop_assert!(is_load_failure);
            prop_assert_eq!(notifier.requests().len(), attempt + 1);
        }
    }
}
