//! Unified error type for the relay layer.
//!
//! The taxonomy mirrors how failures are handled, not where they occur:
//! configuration errors are fatal before any connection attempt, connection
//! errors feed the supervisor's recovery machinery, and store/codec errors
//! surface to the caller of the failing operation.

use thiserror::Error;

/// Unified error type for relay operations
#[derive(Debug, Error)]
pub enum RelayError {
    /// Invalid or incomplete configuration; never retried
    #[error("configuration error: {0}")]
    Config(String),

    /// Broker connectivity failure (connect, publish, subscribe ack)
    #[error("connection error: {0}")]
    Connection(String),

    /// Outbound payload could not be serialized
    #[error("encode failed for {context}: {source}")]
    Encode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Stored value could not be deserialized
    #[error("decode failed for {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Keyspace read/write failed; callers may retry
    #[error("store operation failed on {keyspace}: {detail}")]
    Store { keyspace: String, detail: String },
}

impl RelayError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn encode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Encode {
            context: context.into(),
            source,
        }
    }

    pub fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    pub fn store(keyspace: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Store {
            keyspace: keyspace.into(),
            detail: detail.into(),
        }
    }
}
