//! Transport ports for the dual-connection broker client.
//!
//! The relay always holds two independent broker sessions: one dedicated to
//! publishing (and all keyspace traffic), one dedicated to subscribing.
//! Both are expressed as object-safe ports so the supervisor, router and
//! store never touch a concrete client. The [`redis`] adapter is the
//! production implementation; [`memory`] is an in-process broker used by
//! tests and local development.

pub mod memory;
pub mod redis;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::RelayError;

/// Which of the two sessions an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Publisher,
    Subscriber,
}

/// Lifecycle transition of one broker session.
///
/// Emitted on every underlying state change, consumed by the supervisor's
/// watchdog and by diagnostics. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Ready,
    Reconnecting,
    Closed,
    Errored { detail: String },
}

/// A status transition tagged with the session it came from.
#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub session: SessionKind,
    pub status: ConnectionStatus,
}

pub type StatusSender = mpsc::UnboundedSender<StatusEvent>;
pub type StatusReceiver = mpsc::UnboundedReceiver<StatusEvent>;

/// Raw-payload callback registered for one topic.
///
/// Handlers receive the undecoded wire payload; decoding (and the
/// drop-on-decode-failure policy) lives in the router, not the transport.
pub type MessageHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Publishing session: pub/sub sends plus all keyspace traffic.
///
/// Keyspace writes take the TTL alongside the payload so adapters can issue
/// the write and the expiration refresh as one coordinated batch.
#[async_trait]
pub trait PublisherSession: Send + Sync {
    /// Publish a raw payload, returning the broker's best-effort receiver
    /// count (not a delivery guarantee).
    async fn publish(&self, topic: &str, payload: &str) -> Result<u64, RelayError>;

    /// Write hash fields and refresh the key's expiration together.
    async fn set_hash_fields(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl: Duration,
    ) -> Result<(), RelayError>;

    /// Batched read; positions align with `fields`, absent fields are `None`.
    async fn get_hash_fields(
        &self,
        key: &str,
        fields: &[&str],
    ) -> Result<Vec<Option<String>>, RelayError>;

    /// Read every field present under a key.
    async fn get_hash_all(&self, key: &str) -> Result<HashMap<String, String>, RelayError>;

    /// Append to a list and refresh that key's expiration together.
    async fn push_list(&self, key: &str, value: &str, ttl: Duration) -> Result<(), RelayError>;

    /// Health-check round trip.
    async fn ping(&self) -> Result<(), RelayError>;

    fn is_ready(&self) -> bool;

    /// Close the session. Must be safe to call more than once.
    async fn close(&self) -> Result<(), RelayError>;
}

/// Subscribing session.
#[async_trait]
pub trait SubscriberSession: Send + Sync {
    /// Register a handler for a topic. Multiple handlers per topic are
    /// allowed; each is invoked independently for every delivery.
    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), RelayError>;

    fn is_ready(&self) -> bool;

    /// Close the session. Must be safe to call more than once.
    async fn close(&self) -> Result<(), RelayError>;
}
