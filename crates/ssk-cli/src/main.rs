//! Shared Sender Keys command-line tool.
//!
//! # Usage
//!
//! ```bash
//! # Sender creates a chain and hands the chain key to the group
//! ssk --db alice.redb generate --group g1 --sender alice
//!
//! # A member installs it
//! ssk --db bob.redb install --group g1 --sender alice --chain-key <hex>
//!
//! # Sender encrypts (prints `key_index ciphertext`), member decrypts
//! ssk --db alice.redb encrypt --group g1 --sender alice --plaintext 68656c6c6f
//! ssk --db bob.redb decrypt --group g1 --sender alice --key-index 1 --ciphertext <hex>
//! ```
//!
//! Logs go to stderr; command output goes to stdout.

mod commands;

use std::io::{self, Write};

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{Args, run};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    tracing::debug!(db = %args.db.display(), "opening ratchet database");

    let lines = run(args)?;

    let mut stdout = io::stdout().lock();
    for line in lines {
        writeln!(stdout, "{line}")?;
    }

    Ok(())
}
