//! Fuzz target for the ratchet controller under arbitrary delivery
//!
//! A sender encrypts, rotates and hands its chain key to a receiver; the
//! receiver decrypts messages in whatever order the fuzzer picks.
//!
//! # Strategy
//!
//! - Arbitrary interleaving of sends, deliveries, replays and rotations
//! - Deliveries far behind or far ahead of the receiver's position
//! - Messages from the previous chain delivered after a rotation
//! - Garbage blobs at arbitrary key indices
//!
//! # Invariants
//!
//! - No operation panics
//! - A message decrypts exactly when its chain is `Current` or `Old` on the
//!   receiver and its key is inside the candidate window after catch-up
//! - Decryption failures never request a resync while state exists
//! - The receiver's `Current` key index never moves backwards on receive
//! - The sender's key index grows by exactly one per send

#![no_main]

use std::sync::atomic::{AtomicU64, Ordering};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ssk_core::{
    Generation, GroupId, MemoryRatchetStore, RatchetStore, RecordingResyncNotifier, SenderId,
    SharedSenderKeys,
};
use ssk_crypto::{MAX_CANDIDATE_KEYS, RandomSource, RatchetState};

/// Deterministic random source so crashes reproduce.
struct FuzzRandom {
    counter: AtomicU64,
}

impl RandomSource for FuzzRandom {
    fn fill_bytes(&self, buffer: &mut [u8]) {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = (n.wrapping_mul(31).wrapping_add(i as u64) % 251) as u8;
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct ControllerScenario {
    operations: Vec<Operation>,
}

#[derive(Debug, Clone, Arbitrary)]
enum Operation {
    /// Sender encrypts a payload
    Send { payload: Vec<u8> },
    /// Receiver gets the message at this position in the sent log
    Deliver { which: u16 },
    /// Sender rotates and the receiver installs the new chain
    Rotate,
    /// Receiver gets garbage claiming an arbitrary key index
    Garbage { key_index: u8, blob: Vec<u8> },
}

struct Sent {
    chain: usize,
    key_index: u64,
    blob: Vec<u8>,
    payload: Vec<u8>,
}

fn load(store: &MemoryRatchetStore, generation: Generation) -> Option<RatchetState> {
    let (group, sender) = ids();
    match store.load(&mut (), &group, &sender, generation) {
        Ok(state) => state,
        Err(e) => panic!("memory store failed: {e}"),
    }
}

fn ids() -> (GroupId, SenderId) {
    (GroupId::from("fuzz-group"), SenderId::from("fuzz-sender"))
}

/// Whether `state` can open a message at `key_index` after catching up.
fn in_window(state: &RatchetState, key_index: u64) -> bool {
    let newest = state.key_index().max(key_index);
    key_index >= 1 && newest - key_index < MAX_CANDIDATE_KEYS as u64
}

fuzz_target!(|scenario: ControllerScenario| {
    let (group, sender) = ids();
    let sender_store = MemoryRatchetStore::new();
    let receiver_store = MemoryRatchetStore::new();
    let notifier = RecordingResyncNotifier::new();
    let rng = || FuzzRandom { counter: AtomicU64::new(0) };
    let alice = SharedSenderKeys::new(&sender_store, &notifier, rng());
    let bob = SharedSenderKeys::new(&receiver_store, &notifier, rng());

    let Ok(root) = alice.generate_ratchet(&mut (), &group, &sender) else {
        panic!("generate on memory store failed");
    };
    if bob.install_chain_key(&mut (), &group, &sender, root.chain_key().clone()).is_err() {
        panic!("install on memory store failed");
    }

    let mut sent: Vec<Sent> = Vec::new();
    let mut chain = 0usize;

    for op in scenario.operations.into_iter().take(256) {
        match op {
            Operation::Send { payload } => {
                let before = load(&sender_store, Generation::Current).map(|s| s.key_index());
                match alice.encrypt(&mut (), &payload, &group, &sender) {
                    Ok((blob, key_index)) => {
                        // INVARIANT: sender steps exactly once per send
                        assert_eq!(Some(key_index), before.map(|k| k + 1));
                        sent.push(Sent { chain, key_index, blob, payload });
                    },
                    Err(e) => panic!("encrypt with existing state failed: {e}"),
                }
            },

            Operation::Deliver { which } => {
                if sent.is_empty() {
                    continue;
                }
                let message = &sent[which as usize % sent.len()];

                let current = load(&receiver_store, Generation::Current);
                let old = load(&receiver_store, Generation::Old);
                let expected = current
                    .as_ref()
                    .is_some_and(|s| message.chain == chain && in_window(s, message.key_index))
                    || old.as_ref().is_some_and(|s| {
                        message.chain + 1 == chain && in_window(s, message.key_index)
                    });

                let result =
                    bob.decrypt(&mut (), &message.blob, &group, &sender, message.key_index);

                // INVARIANT: success exactly when the chain and window allow it
                match result {
                    Ok(plaintext) => {
                        assert!(expected, "decrypted a message outside the window");
                        assert_eq!(plaintext, message.payload);
                    },
                    Err(e) => assert!(!expected, "in-window message failed: {e}"),
                }

                // INVARIANT: receive never rewinds the live chain
                let after = load(&receiver_store, Generation::Current);
                let before_index = current.map_or(0, |s| s.key_index());
                assert!(after.map_or(0, |s| s.key_index()) >= before_index);
            },

            Operation::Rotate => {
                let Ok(next) = alice.rotate(&mut (), &group, &sender) else {
                    panic!("rotate on memory store failed");
                };
                if bob.install_chain_key(&mut (), &group, &sender, next.chain_key().clone()).is_err()
                {
                    panic!("install on memory store failed");
                }
                chain += 1;
            },

            Operation::Garbage { key_index, blob } => {
                // Only panics and resync requests matter here
                let _ = bob.decrypt(&mut (), &blob, &group, &sender, u64::from(key_index));
            },
        }

        // INVARIANT: state always exists, so no resync is ever requested
        assert!(notifier.requests().is_empty(), "resync requested while state exists");
    }
});
