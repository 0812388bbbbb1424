//! Gamewire Relay - resilient dual-connection pub/sub client.
//!
//! This crate carries game-event notifications between a broker and
//! in-process consumers:
//!
//! - [`ConnectionSupervisor`] owns a publisher/subscriber session pair,
//!   recovers the subscriber from transient loss with bounded backoff, and
//!   fails fast (exit code [`EXIT_BROKER_UNRECOVERABLE`]) when connectivity
//!   stays broken past a one-second grace window.
//! - [`TopicRouter`] derives wire topics from `(bot id, channel kind)`,
//!   JSON-codes payloads, and dispatches decoded messages to registered
//!   callbacks, dropping (never propagating) undecodable payloads.
//! - [`KeyspaceStore`] provides TTL-bounded hash and list helpers over the
//!   publisher session.
//!
//! The broker is reached through the ports in [`transport`]; the `redis`
//! adapter is the production transport and the in-memory adapter backs
//! tests and local development.

pub mod backoff;
pub mod config;
pub mod error;
pub mod router;
pub mod store;
pub mod supervisor;
pub mod transport;

pub use backoff::BackoffPolicy;
pub use config::{RelayConfig, RelayOptions};
pub use error::RelayError;
pub use router::{topic_name, ChannelKind, TopicRouter};
pub use store::KeyspaceStore;
pub use supervisor::{ConnectionSupervisor, EXIT_BROKER_UNRECOVERABLE, GRACE_WINDOW};
pub use transport::{ConnectionStatus, SessionKind, StatusEvent};
