//! Subcommand execution against a redb-backed ratchet store.
//!
//! Every invocation runs in a single write transaction that is committed
//! only when the command succeeds, so a failed decrypt never leaves a
//! half-advanced ratchet behind.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ssk_core::{
    ChannelResyncNotifier, Generation, GroupId, RatchetError, RatchetStore, RedbRatchetStore,
    SenderId, SenderKeysConfig, SharedSenderKeys, StoreError,
};
use ssk_crypto::{ChainKey, KEY_SIZE, MAX_CANDIDATE_KEYS, OsRandom, RatchetState};
use thiserror::Error;

/// Shared Sender Keys operator tool
#[derive(Parser, Debug)]
#[command(name = "ssk")]
#[command(about = "Drive Shared Sender Keys ratchets stored in a redb database")]
#[command(version)]
pub struct Args {
    /// Path to the ratchet database (created if missing)
    #[arg(long, default_value = "ssk.redb")]
    pub db: PathBuf,

    /// Number of newest message keys tried when decrypting (1 to 16)
    #[arg(long, default_value_t = MAX_CANDIDATE_KEYS)]
    pub candidate_window: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Ratchet identity shared by every subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct Pair {
    /// Group identifier
    #[arg(long)]
    pub group: String,

    /// Sender identifier
    #[arg(long)]
    pub sender: String,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a fresh chain for a sender and print its chain key
    Generate {
        #[command(flatten)]
        pair: Pair,
    },

    /// Install a chain key distributed by a sender
    Install {
        #[command(flatten)]
        pair: Pair,

        /// Chain key as 64 hex characters
        #[arg(long)]
        chain_key: String,
    },

    /// Encrypt a hex payload and print `key_index ciphertext`
    Encrypt {
        #[command(flatten)]
        pair: Pair,

        /// Plaintext as hex
        #[arg(long)]
        plaintext: String,
    },

    /// Decrypt a hex ciphertext sent at `key_index` and print the payload
    Decrypt {
        #[command(flatten)]
        pair: Pair,

        /// Key index transmitted with the message
        #[arg(long)]
        key_index: u64,

        /// Ciphertext blob as hex
        #[arg(long)]
        ciphertext: String,
    },

    /// Archive the live chain and generate a new one
    Rotate {
        #[command(flatten)]
        pair: Pair,
    },

    /// Print the key index of both generations
    Show {
        #[command(flatten)]
        pair: Pair,
    },
}

/// Errors reported by the command-line tool.
#[derive(Error, Debug)]
pub enum CliError {
    /// Protocol operation failed
    #[error(transparent)]
    Ratchet(#[from] RatchetError),

    /// Database could not be opened or committed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Argument was not valid hex
    #[error("--{field} is not valid hex: {source}")]
    Hex {
        /// Offending argument
        field: &'static str,
        /// Decoder error
        #[source]
        source: hex::FromHexError,
    },

    /// Chain key had the wrong length
    #[error("chain key must be 32 bytes, got {0}")]
    ChainKeyLength(usize),
}

/// Execute `args.command` and return the lines to print.
///
/// Resync requests raised along the way are logged; the sender has to
/// redistribute its chain key before the command can succeed.
pub fn run(args: Args) -> Result<Vec<String>, CliError> {
    let store = RedbRatchetStore::open(&args.db)?;
    let (notifier, mut resync_rx) = ChannelResyncNotifier::channel();
    let config = SenderKeysConfig::default().with_candidate_window(args.candidate_window);
    let ssk = SharedSenderKeys::with_config(&store, &notifier, OsRandom, config);

    let mut tx = store.begin()?;
    let result = execute(&ssk, &mut tx, args.command);

    while let Ok(request) = resync_rx.try_recv() {
        tracing::warn!(
            group = %request.group,
            sender = %request.sender,
            "sender key required, ask the sender to redistribute it"
        );
    }

    let lines = result?;
    store.commit(tx)?;
    Ok(lines)
}

fn execute(
    ssk: &SharedSenderKeys<'_, RedbRatchetStore, OsRandom>,
    tx: &mut <RedbRatchetStore as RatchetStore>::Transaction,
    command: Command,
) -> Result<Vec<String>, CliError> {
    match command {
        Command::Generate { pair } => {
            let (group, sender) = pair.ids();
            let state = ssk.generate_ratchet(tx, &group, &sender)?;
            Ok(vec![hex::encode(state.chain_key().as_bytes())])
        },
        Command::Install { pair, chain_key } => {
            let (group, sender) = pair.ids();
            let state = ssk.install_chain_key(tx, &group, &sender, parse_chain_key(&chain_key)?)?;
            Ok(vec![describe("current", Some(&state))])
        },
        Command::Encrypt { pair, plaintext } => {
            let (group, sender) = pair.ids();
            let plaintext = decode_hex("plaintext", &plaintext)?;
            let (blob, key_index) = ssk.encrypt(tx, &plaintext, &group, &sender)?;
            Ok(vec![format!("{key_index} {}", hex::encode(blob))])
        },
        Command::Decrypt { pair, key_index, ciphertext } => {
            let (group, sender) = pair.ids();
            let blob = decode_hex("ciphertext", &ciphertext)?;
            let plaintext = ssk.decrypt(tx, &blob, &group, &sender, key_index)?;
            Ok(vec![hex::encode(plaintext)])
        },
        Command::Rotate { pair } => {
            let (group, sender) = pair.ids();
            let state = ssk.rotate(tx, &group, &sender)?;
            Ok(vec![hex::encode(state.chain_key().as_bytes())])
        },
        Command::Show { pair } => {
            let (group, sender) = pair.ids();
            let current = ssk.current_state(tx, &group, &sender)?;
            let old = ssk.controller().load(tx, &group, &sender, Generation::Old)?;
            Ok(vec![describe("current", current.as_ref()), describe("old", old.as_ref())])
        },
    }
}

impl Pair {
    fn ids(&self) -> (GroupId, SenderId) {
        (GroupId::from(self.group.as_str()), SenderId::from(self.sender.as_str()))
    }
}

fn describe(label: &str, state: Option<&RatchetState>) -> String {
    match state {
        Some(state) => format!("{label}: key_index={}", state.key_index()),
        None => format!("{label}: none"),
    }
}

fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, CliError> {
    hex::decode(value.trim()).map_err(|source| CliError::Hex { field, source })
}

fn parse_chain_key(value: &str) -> Result<ChainKey, CliError> {
    let bytes = decode_hex("chain-key", value)?;
    let bytes: [u8; KEY_SIZE] =
        bytes.try_into().map_err(|b: Vec<u8>| CliError::ChainKeyLength(b.len()))?;
    Ok(ChainKey::from_bytes(bytes))
}
