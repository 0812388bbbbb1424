//! Topic router: topic naming, payload codec, and per-topic dispatch.
//!
//! Topic names are derived deterministically from the bot id and the
//! channel kind, so every component (and every process on the broker)
//! computes the same name without coordination.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use gamewire_domain::BotId;

use crate::error::RelayError;
use crate::transport::{MessageHandler, PublisherSession, SubscriberSession};

/// Logical category of messages on a bot's channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Lifecycle events: connected, joined, game_start, ...
    State,
    /// Per-turn scoreboard updates
    GameUpdate,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::State => "state",
            ChannelKind::GameUpdate => "game_update",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire topic for a (bot, channel kind) pair: `{bot}-{kind}`.
pub fn topic_name(bot: &BotId, kind: ChannelKind) -> String {
    format!("{bot}-{kind}")
}

/// Encodes, decodes and dispatches channel payloads over a session pair.
#[derive(Clone)]
pub struct TopicRouter {
    publisher: Arc<dyn PublisherSession>,
    subscriber: Arc<dyn SubscriberSession>,
}

impl TopicRouter {
    pub fn new(
        publisher: Arc<dyn PublisherSession>,
        subscriber: Arc<dyn SubscriberSession>,
    ) -> Self {
        Self {
            publisher,
            subscriber,
        }
    }

    /// JSON-encode a payload and publish it.
    ///
    /// Returns the broker's receiver count, which is best effort and not a
    /// delivery guarantee.
    pub async fn publish<T: Serialize>(
        &self,
        bot: &BotId,
        kind: ChannelKind,
        payload: &T,
    ) -> Result<u64, RelayError> {
        let topic = topic_name(bot, kind);
        let encoded =
            serde_json::to_string(payload).map_err(|err| RelayError::encode(&topic, err))?;
        self.publisher.publish(&topic, &encoded).await
    }

    /// Register a typed callback for a channel, returning the computed topic
    /// name for diagnostics.
    ///
    /// A payload that fails to decode is logged with its raw text and
    /// dropped; it never reaches the callback and never tears down the
    /// subscription. One malformed message must not break delivery of the
    /// next one.
    pub async fn subscribe<T, F>(
        &self,
        bot: &BotId,
        kind: ChannelKind,
        callback: F,
    ) -> Result<String, RelayError>
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let topic = topic_name(bot, kind);
        tracing::debug!(topic = %topic, "subscribing");

        let decode_topic = topic.clone();
        let handler: MessageHandler = Arc::new(move |raw: &str| {
            match serde_json::from_str::<T>(raw) {
                Ok(payload) => callback(payload),
                Err(err) => {
                    tracing::warn!(
                        topic = %decode_topic,
                        raw,
                        error = %err,
                        "dropping undecodable message"
                    );
                }
            }
        });

        self.subscriber.subscribe(&topic, handler).await?;
        tracing::debug!(topic = %topic, "subscribed");
        Ok(topic)
    }
}
