//! In-process broker used by tests and local development.
//!
//! One [`MemoryBroker`] plays the role of the external broker; session pairs
//! handed out by [`MemoryBroker::sessions`] share its topic registry and
//! keyspace maps. Delivery is synchronous inside `publish`, which makes
//! scenario tests deterministic without sleeps.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::RelayError;
use crate::transport::{
    ConnectionStatus, MessageHandler, PublisherSession, SessionKind, StatusEvent, StatusSender,
    SubscriberSession,
};

#[derive(Default)]
struct BrokerInner {
    subscriptions: Mutex<HashMap<String, Vec<MessageHandler>>>,
    hashes: Mutex<HashMap<String, HashMap<String, String>>>,
    lists: Mutex<HashMap<String, Vec<String>>>,
    /// Last TTL applied per key, recorded so tests can assert refreshes
    ttls: Mutex<HashMap<String, Duration>>,
}

/// Shared in-process broker state.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connected publisher/subscriber pair with nowhere to report
    /// status. Convenient for router and store tests.
    pub fn sessions(&self) -> (Arc<MemoryPublisher>, Arc<MemorySubscriber>) {
        let (status_tx, _status_rx) = tokio::sync::mpsc::unbounded_channel();
        self.sessions_with_status(status_tx)
    }

    /// Create a connected publisher/subscriber pair reporting status events
    /// on the given channel. Both sessions start ready.
    pub fn sessions_with_status(
        &self,
        status_tx: StatusSender,
    ) -> (Arc<MemoryPublisher>, Arc<MemorySubscriber>) {
        for session in [SessionKind::Publisher, SessionKind::Subscriber] {
            for status in [
                ConnectionStatus::Connecting,
                ConnectionStatus::Connected,
                ConnectionStatus::Ready,
            ] {
                let _ = status_tx.send(StatusEvent { session, status });
            }
        }
        let publisher = Arc::new(MemoryPublisher {
            broker: self.clone(),
            ready: AtomicBool::new(true),
            status_tx: status_tx.clone(),
        });
        let subscriber = Arc::new(MemorySubscriber {
            broker: self.clone(),
            ready: AtomicBool::new(true),
            status_tx,
        });
        (publisher, subscriber)
    }

    /// Last TTL applied to a key, if any write touched it.
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        lock(&self.inner.ttls).get(key).copied()
    }

    /// Raw list contents under a key.
    pub fn list(&self, key: &str) -> Vec<String> {
        lock(&self.inner.lists).get(key).cloned().unwrap_or_default()
    }
}

/// Publisher half of an in-process session pair.
pub struct MemoryPublisher {
    broker: MemoryBroker,
    ready: AtomicBool,
    status_tx: StatusSender,
}

impl MemoryPublisher {
    /// Flip the readiness flag, simulating a session dropping or recovering.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }
}

#[async_trait]
impl PublisherSession for MemoryPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<u64, RelayError> {
        if !self.ready.load(Ordering::SeqCst) {
            return Err(RelayError::connection("publisher session is not ready"));
        }
        let handlers: Vec<MessageHandler> = lock(&self.broker.inner.subscriptions)
            .get(topic)
            .cloned()
            .unwrap_or_default();
        for handler in &handlers {
            handler(payload);
        }
        Ok(handlers.len() as u64)
    }

    async fn set_hash_fields(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl: Duration,
    ) -> Result<(), RelayError> {
        {
            let mut hashes = lock(&self.broker.inner.hashes);
            let entry = hashes.entry(key.to_string()).or_default();
            for (field, value) in fields {
                entry.insert(field.clone(), value.clone());
            }
        }
        lock(&self.broker.inner.ttls).insert(key.to_string(), ttl);
        Ok(())
    }

    async fn get_hash_fields(
        &self,
        key: &str,
        fields: &[&str],
    ) -> Result<Vec<Option<String>>, RelayError> {
        let hashes = lock(&self.broker.inner.hashes);
        let record = hashes.get(key);
        Ok(fields
            .iter()
            .map(|field| record.and_then(|r| r.get(*field).cloned()))
            .collect())
    }

    async fn get_hash_all(&self, key: &str) -> Result<HashMap<String, String>, RelayError> {
        Ok(lock(&self.broker.inner.hashes)
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn push_list(&self, key: &str, value: &str, ttl: Duration) -> Result<(), RelayError> {
        lock(&self.broker.inner.lists)
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        lock(&self.broker.inner.ttls).insert(key.to_string(), ttl);
        Ok(())
    }

    async fn ping(&self) -> Result<(), RelayError> {
        if self.ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RelayError::connection("publisher session is not ready"))
        }
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), RelayError> {
        self.ready.store(false, Ordering::SeqCst);
        let _ = self.status_tx.send(StatusEvent {
            session: SessionKind::Publisher,
            status: ConnectionStatus::Closed,
        });
        Ok(())
    }
}

/// Subscriber half of an in-process session pair.
pub struct MemorySubscriber {
    broker: MemoryBroker,
    ready: AtomicBool,
    status_tx: StatusSender,
}

impl MemorySubscriber {
    /// Flip the readiness flag, simulating a session dropping or recovering.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubscriberSession for MemorySubscriber {
    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), RelayError> {
        lock(&self.broker.inner.subscriptions)
            .entry(topic.to_string())
            .or_default()
            .push(handler);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), RelayError> {
        self.ready.store(false, Ordering::SeqCst);
        let _ = self.status_tx.send(StatusEvent {
            session: SessionKind::Subscriber,
            status: ConnectionStatus::Closed,
        });
        Ok(())
    }
}
