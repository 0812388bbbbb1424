//! Redis adapter for the transport ports.
//!
//! The publisher session wraps a [`ConnectionManager`], which transparently
//! re-establishes its connection; that library-level behavior is all the
//! recovery the publisher gets. The subscriber session owns a dedicated
//! pub/sub connection driven by a background task, and recovery there is
//! explicit: on stream loss the driver walks the [`BackoffPolicy`] ramp,
//! re-subscribing every registered topic after each successful reconnect.
//! When the budget is exhausted the session goes terminally unready and the
//! supervisor's watchdog takes over.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::{ConnectionManager, PubSubSink, PubSubStream};
use redis::Client;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::backoff::BackoffPolicy;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::transport::{
    ConnectionStatus, MessageHandler, PublisherSession, SessionKind, StatusEvent, StatusSender,
    SubscriberSession,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn connection_error(err: redis::RedisError) -> RelayError {
    RelayError::connection(err.to_string())
}

/// Readiness tracking for one session.
///
/// The flag mirrors the outcome of the most recent broker interaction: a
/// failed command marks the session unready, the next successful one marks
/// it ready again. Every failure is reported on the status channel; the
/// `Ready` status is only emitted on the unready-to-ready transition.
struct SessionHealth {
    session: SessionKind,
    ready: AtomicBool,
    status_tx: StatusSender,
}

impl SessionHealth {
    fn new(session: SessionKind, status_tx: StatusSender) -> Self {
        Self {
            session,
            ready: AtomicBool::new(false),
            status_tx,
        }
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn mark_ready(&self) {
        if !self.ready.swap(true, Ordering::SeqCst) {
            self.status(ConnectionStatus::Ready);
        }
    }

    fn mark_failed(&self, detail: impl Into<String>) {
        self.ready.store(false, Ordering::SeqCst);
        self.status(ConnectionStatus::Errored {
            detail: detail.into(),
        });
    }

    fn mark_closed(&self) {
        self.ready.store(false, Ordering::SeqCst);
        self.status(ConnectionStatus::Closed);
    }

    fn status(&self, status: ConnectionStatus) {
        let _ = self.status_tx.send(StatusEvent {
            session: self.session,
            status,
        });
    }
}

/// Establish both broker sessions.
///
/// Resolves only once the publisher and the subscriber are connected; any
/// failure before that (bad address, refused connection, auth) is returned
/// to the caller without touching the retry budget.
pub async fn connect(
    config: &RelayConfig,
    policy: BackoffPolicy,
    status_tx: StatusSender,
) -> Result<(Arc<RedisPublisher>, Arc<RedisSubscriber>), RelayError> {
    let client = Client::open(config.url()).map_err(connection_error)?;

    let publisher = RedisPublisher::connect(client.clone(), status_tx.clone()).await?;
    let subscriber = RedisSubscriber::connect(client, policy, status_tx).await?;

    Ok((Arc::new(publisher), Arc::new(subscriber)))
}

/// Publishing session over a managed multiplexed connection.
pub struct RedisPublisher {
    conn: ConnectionManager,
    health: SessionHealth,
}

impl RedisPublisher {
    async fn connect(client: Client, status_tx: StatusSender) -> Result<Self, RelayError> {
        let health = SessionHealth::new(SessionKind::Publisher, status_tx);
        health.status(ConnectionStatus::Connecting);
        let conn = ConnectionManager::new(client).await.map_err(|err| {
            health.mark_failed(err.to_string());
            connection_error(err)
        })?;
        health.status(ConnectionStatus::Connected);
        health.mark_ready();
        Ok(Self { conn, health })
    }

    /// Fold a command outcome into the readiness flag.
    ///
    /// [`ConnectionManager`] recovers on its own but exposes no state to
    /// observe, so readiness is inferred from command traffic: a failure
    /// flips the flag (and feeds the watchdog), the next success restores
    /// it.
    fn track<T>(&self, result: Result<T, redis::RedisError>) -> Result<T, RelayError> {
        match result {
            Ok(value) => {
                self.health.mark_ready();
                Ok(value)
            }
            Err(err) => {
                self.health.mark_failed(err.to_string());
                Err(connection_error(err))
            }
        }
    }
}

#[async_trait]
impl PublisherSession for RedisPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<u64, RelayError> {
        let mut conn = self.conn.clone();
        let receivers: i64 = self.track(
            redis::cmd("PUBLISH")
                .arg(topic)
                .arg(payload)
                .query_async(&mut conn)
                .await,
        )?;
        Ok(receivers.max(0) as u64)
    }

    async fn set_hash_fields(
        &self,
        key: &str,
        fields: &[(String, String)],
        ttl: Duration,
    ) -> Result<(), RelayError> {
        let mut conn = self.conn.clone();
        self.track(
            redis::pipe()
                .atomic()
                .hset_multiple(key, fields)
                .ignore()
                .expire(key, ttl.as_secs() as i64)
                .ignore()
                .query_async::<()>(&mut conn)
                .await,
        )
    }

    async fn get_hash_fields(
        &self,
        key: &str,
        fields: &[&str],
    ) -> Result<Vec<Option<String>>, RelayError> {
        let mut conn = self.conn.clone();
        self.track(
            redis::cmd("HMGET")
                .arg(key)
                .arg(fields)
                .query_async(&mut conn)
                .await,
        )
    }

    async fn get_hash_all(&self, key: &str) -> Result<HashMap<String, String>, RelayError> {
        let mut conn = self.conn.clone();
        self.track(redis::cmd("HGETALL").arg(key).query_async(&mut conn).await)
    }

    async fn push_list(&self, key: &str, value: &str, ttl: Duration) -> Result<(), RelayError> {
        let mut conn = self.conn.clone();
        self.track(
            redis::pipe()
                .atomic()
                .rpush(key, value)
                .ignore()
                .expire(key, ttl.as_secs() as i64)
                .ignore()
                .query_async::<()>(&mut conn)
                .await,
        )
    }

    async fn ping(&self) -> Result<(), RelayError> {
        let mut conn = self.conn.clone();
        self.track(redis::cmd("PING").query_async::<()>(&mut conn).await)
    }

    fn is_ready(&self) -> bool {
        self.health.is_ready()
    }

    async fn close(&self) -> Result<(), RelayError> {
        // ConnectionManager has no explicit quit; dropping the last clone
        // closes the socket. Mark unready so shutdown skips us next time.
        self.health.mark_closed();
        Ok(())
    }
}

struct SubscribeRequest {
    topic: String,
    ack: oneshot::Sender<Result<(), RelayError>>,
}

type TopicRegistry = Arc<Mutex<HashMap<String, Vec<MessageHandler>>>>;

/// Subscribing session over a dedicated pub/sub connection.
pub struct RedisSubscriber {
    registry: TopicRegistry,
    control_tx: mpsc::UnboundedSender<SubscribeRequest>,
    health: Arc<SessionHealth>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl RedisSubscriber {
    async fn connect(
        client: Client,
        policy: BackoffPolicy,
        status_tx: StatusSender,
    ) -> Result<Self, RelayError> {
        let health = Arc::new(SessionHealth::new(SessionKind::Subscriber, status_tx));
        health.status(ConnectionStatus::Connecting);
        let pubsub = client.get_async_pubsub().await.map_err(|err| {
            health.mark_failed(err.to_string());
            connection_error(err)
        })?;
        health.status(ConnectionStatus::Connected);
        health.mark_ready();

        let (sink, stream) = pubsub.split();
        let registry: TopicRegistry = Arc::new(Mutex::new(HashMap::new()));
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let driver = tokio::spawn(drive(
            client,
            policy,
            Arc::clone(&registry),
            Arc::clone(&health),
            control_rx,
            sink,
            stream,
        ));

        Ok(Self {
            registry,
            control_tx,
            health,
            driver: Mutex::new(Some(driver)),
        })
    }
}

#[async_trait]
impl SubscriberSession for RedisSubscriber {
    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), RelayError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.control_tx
            .send(SubscribeRequest {
                topic: topic.to_string(),
                ack: ack_tx,
            })
            .map_err(|_| RelayError::connection("subscriber session is closed"))?;
        ack_rx
            .await
            .map_err(|_| RelayError::connection("subscriber session is closed"))??;

        // Only an acknowledged subscription gets a handler; otherwise a
        // later reconnect would resubscribe a topic the caller saw fail.
        lock(&self.registry)
            .entry(topic.to_string())
            .or_default()
            .push(handler);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.health.is_ready()
    }

    async fn close(&self) -> Result<(), RelayError> {
        if let Some(driver) = lock(&self.driver).take() {
            driver.abort();
        }
        self.health.mark_closed();
        Ok(())
    }
}

fn dispatch(registry: &TopicRegistry, msg: &redis::Msg) {
    let topic = msg.get_channel_name().to_string();
    let payload: String = match msg.get_payload() {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(topic = %topic, error = %err, "dropping non-text broker message");
            return;
        }
    };
    let handlers: Vec<MessageHandler> = lock(registry).get(&topic).cloned().unwrap_or_default();
    for handler in &handlers {
        handler(&payload);
    }
}

/// Background task owning the pub/sub connection.
///
/// Serves subscribe requests and fans incoming messages out to registered
/// handlers. When the stream ends the connection is gone: the task walks the
/// backoff ramp, re-subscribing every registered topic on success, and goes
/// terminally unready once the budget runs out.
async fn drive(
    client: Client,
    policy: BackoffPolicy,
    registry: TopicRegistry,
    health: Arc<SessionHealth>,
    mut control_rx: mpsc::UnboundedReceiver<SubscribeRequest>,
    mut sink: PubSubSink,
    mut stream: PubSubStream,
) {
    loop {
        tokio::select! {
            request = control_rx.recv() => {
                let Some(request) = request else {
                    // Session handle dropped; nothing left to serve.
                    break;
                };
                let result = sink
                    .subscribe(&request.topic)
                    .await
                    .map_err(connection_error);
                let _ = request.ack.send(result);
            }
            msg = stream.next() => {
                match msg {
                    Some(msg) => dispatch(&registry, &msg),
                    None => {
                        health.mark_failed("pub/sub connection lost");
                        health.status(ConnectionStatus::Reconnecting);
                        match reestablish(&client, &policy, &registry, &health).await {
                            Some((new_sink, new_stream)) => {
                                sink = new_sink;
                                stream = new_stream;
                                health.status(ConnectionStatus::Connected);
                                health.mark_ready();
                            }
                            None => {
                                tracing::error!("subscriber reconnect budget exhausted, session is terminally failed");
                                health.mark_failed("reconnect budget exhausted");
                                break;
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Walk the backoff ramp until a fresh pub/sub connection carries every
/// registered topic again, or the budget is exhausted.
async fn reestablish(
    client: &Client,
    policy: &BackoffPolicy,
    registry: &TopicRegistry,
    health: &SessionHealth,
) -> Option<(PubSubSink, PubSubStream)> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let delay = policy.next_delay(attempt)?;
        tokio::time::sleep(delay).await;

        health.status(ConnectionStatus::Connecting);
        tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "reconnecting subscriber session");

        let mut pubsub = match client.get_async_pubsub().await {
            Ok(pubsub) => pubsub,
            Err(err) => {
                tracing::warn!(attempt, error = %err, "subscriber reconnect attempt failed");
                health.mark_failed(err.to_string());
                continue;
            }
        };

        let topics: Vec<String> = lock(registry).keys().cloned().collect();
        let mut resubscribed = true;
        for topic in &topics {
            if let Err(err) = pubsub.subscribe(topic).await {
                tracing::warn!(attempt, topic = %topic, error = %err, "re-subscribe failed");
                resubscribed = false;
                break;
            }
        }
        if !resubscribed {
            continue;
        }

        tracing::info!(attempt, topics = topics.len(), "subscriber session re-established");
        return Some(pubsub.split());
    }
}
