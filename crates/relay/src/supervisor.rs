//! Connection supervisor: owns both broker sessions and escalates when
//! connectivity stays broken.
//!
//! The watchdog implements a deliberate fail-fast protocol: every connection
//! error event (re)starts a single one-second grace timer, and when it fires
//! with either session unready the process terminates with a documented exit
//! code so a supervising process can tell this failure mode apart from
//! others. The timer is debounced per error event, which means sustained
//! flapping just under the window keeps extending it; that matches the
//! long-observed behavior of this protocol and is covered by an explicit
//! test rather than "fixed".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::backoff::BackoffPolicy;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::transport::{
    self, ConnectionStatus, PublisherSession, SessionKind, StatusReceiver, SubscriberSession,
};

/// How long connectivity may stay broken after an error before escalation.
pub const GRACE_WINDOW: Duration = Duration::from_secs(1);

/// Process exit code meaning "broker connectivity could not be restored
/// within the grace window".
pub const EXIT_BROKER_UNRECOVERABLE: i32 = 3;

/// Action taken when the grace window expires with a session unready.
pub type EscalationHook = Arc<dyn Fn() + Send + Sync>;

/// Owns the publisher/subscriber pair and the watchdog task.
///
/// Constructing a supervisor is the only way sessions come into existence,
/// so a second initialization is a second, independent supervisor rather
/// than silent clobbering of shared state.
pub struct ConnectionSupervisor {
    publisher: Arc<dyn PublisherSession>,
    subscriber: Arc<dyn SubscriberSession>,
    watchdog: std::sync::Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl ConnectionSupervisor {
    /// Connect both sessions to the broker and start supervising them.
    ///
    /// Returns only once publisher and subscriber both report connected;
    /// fails the caller if either fails before any retry budget applies
    /// (e.g. misconfiguration). On unrecovered connectivity the default
    /// escalation terminates the process with [`EXIT_BROKER_UNRECOVERABLE`].
    pub async fn connect(config: &RelayConfig) -> Result<Self, RelayError> {
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let (publisher, subscriber) =
            transport::redis::connect(config, BackoffPolicy::default(), status_tx).await?;
        Ok(Self::supervise(
            publisher,
            subscriber,
            status_rx,
            Arc::new(|| std::process::exit(EXIT_BROKER_UNRECOVERABLE)),
        ))
    }

    /// Supervise an already-connected session pair.
    ///
    /// The escalation hook is injectable so tests can observe escalation
    /// instead of dying.
    pub fn supervise(
        publisher: Arc<dyn PublisherSession>,
        subscriber: Arc<dyn SubscriberSession>,
        status_rx: StatusReceiver,
        escalate: EscalationHook,
    ) -> Self {
        let watchdog = tokio::spawn(watchdog(
            Arc::clone(&publisher),
            Arc::clone(&subscriber),
            status_rx,
            escalate,
        ));
        Self {
            publisher,
            subscriber,
            watchdog: std::sync::Mutex::new(Some(watchdog)),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn publisher(&self) -> Arc<dyn PublisherSession> {
        Arc::clone(&self.publisher)
    }

    pub fn subscriber(&self) -> Arc<dyn SubscriberSession> {
        Arc::clone(&self.subscriber)
    }

    /// Health-check round trip over the publisher session.
    pub async fn ping(&self) -> Result<(), RelayError> {
        self.publisher.ping().await
    }

    /// Close both sessions. Idempotent; only sessions reporting ready are
    /// issued a close, and both closes complete before this returns.
    pub async fn shutdown(&self) -> Result<(), RelayError> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let close_publisher = async {
            if self.publisher.is_ready() {
                tracing::info!("closing broker publisher session");
                self.publisher.close().await
            } else {
                Ok(())
            }
        };
        let close_subscriber = async {
            if self.subscriber.is_ready() {
                tracing::info!("closing broker subscriber session");
                self.subscriber.close().await
            } else {
                Ok(())
            }
        };
        let (publisher_closed, subscriber_closed) = tokio::join!(close_publisher, close_subscriber);

        if let Some(watchdog) = lock_watchdog(&self.watchdog).take() {
            watchdog.abort();
        }

        publisher_closed?;
        subscriber_closed?;
        tracing::info!("broker connections closed");
        Ok(())
    }
}

fn lock_watchdog(
    mutex: &std::sync::Mutex<Option<JoinHandle<()>>>,
) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Grace-window watchdog.
///
/// Consumes status events from both sessions. Every `Errored` event
/// (re)arms a single deadline one grace window away; when the deadline
/// fires, both readiness flags are checked exactly once.
async fn watchdog(
    publisher: Arc<dyn PublisherSession>,
    subscriber: Arc<dyn SubscriberSession>,
    mut status_rx: StatusReceiver,
    escalate: EscalationHook,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            event = status_rx.recv() => {
                let Some(event) = event else {
                    // All transports gone; nothing left to watch.
                    break;
                };
                match &event.status {
                    ConnectionStatus::Errored { detail } => {
                        tracing::warn!(
                            session = session_name(event.session),
                            detail = %detail,
                            "broker connection error, grace window started"
                        );
                        deadline = Some(Instant::now() + GRACE_WINDOW);
                    }
                    status => {
                        tracing::debug!(
                            session = session_name(event.session),
                            status = ?status,
                            "broker connection status"
                        );
                    }
                }
            }
            () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                if deadline.is_some() =>
            {
                deadline = None;
                let publisher_ready = publisher.is_ready();
                let subscriber_ready = subscriber.is_ready();
                if publisher_ready && subscriber_ready {
                    tracing::info!("broker connectivity recovered within grace window");
                } else {
                    tracing::error!(
                        publisher_ready,
                        subscriber_ready,
                        "broker connectivity not restored within grace window, terminating"
                    );
                    escalate();
                }
            }
        }
    }
}

fn session_name(session: SessionKind) -> &'static str {
    match session {
        SessionKind::Publisher => "publisher",
        SessionKind::Subscriber => "subscriber",
    }
}
