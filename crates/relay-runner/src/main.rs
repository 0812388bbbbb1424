//! Gamewire relay worker - broker-to-snapshot relay for one bot
//!
//! This crate is the *composition root*: it resolves configuration, brings
//! up the supervised broker sessions, wires the observer, and handles
//! shutdown.
//!
//! # Exit codes
//!
//! - `0` - clean shutdown (ctrl-c)
//! - `1` - startup failure (configuration, first connection attempt)
//! - `3` - broker connectivity could not be restored within the grace
//!   window (see `gamewire_relay::EXIT_BROKER_UNRECOVERABLE`)

mod run;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run::run().await
}
