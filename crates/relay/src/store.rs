//! Keyspace store: typed hash/list helpers over the publisher session.
//!
//! Every write refreshes the key's expiration with the single process-wide
//! TTL, so a keyspace that stops being written simply ages out; there is no
//! explicit delete path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::RelayError;
use crate::transport::PublisherSession;

/// TTL-bounded hash and list storage scoped by keyspace name.
#[derive(Clone)]
pub struct KeyspaceStore {
    publisher: Arc<dyn PublisherSession>,
    expiration: Duration,
}

impl KeyspaceStore {
    pub fn new(publisher: Arc<dyn PublisherSession>, expiration: Duration) -> Self {
        Self {
            publisher,
            expiration,
        }
    }

    /// Serialize and write fields in one batch, refreshing the keyspace TTL.
    ///
    /// The write and the expiration refresh are issued together; if either
    /// fails the operation fails as a whole.
    pub async fn set_fields(
        &self,
        keyspace: &str,
        fields: &HashMap<String, Value>,
    ) -> Result<(), RelayError> {
        let mut encoded = Vec::with_capacity(fields.len());
        for (field, value) in fields {
            let raw = serde_json::to_string(value)
                .map_err(|err| RelayError::encode(format!("{keyspace}.{field}"), err))?;
            encoded.push((field.clone(), raw));
        }

        self.publisher
            .set_hash_fields(keyspace, &encoded, self.expiration)
            .await
            .map_err(|err| store_error(keyspace, err))
    }

    /// Batched read of the requested fields; a field never written is `None`.
    pub async fn get_fields(
        &self,
        keyspace: &str,
        fields: &[&str],
    ) -> Result<Vec<Option<Value>>, RelayError> {
        let raw = self
            .publisher
            .get_hash_fields(keyspace, fields)
            .await
            .map_err(|err| store_error(keyspace, err))?;

        raw.into_iter()
            .zip(fields)
            .map(|(value, field)| match value {
                None => Ok(None),
                Some(raw) => serde_json::from_str(&raw)
                    .map(Some)
                    .map_err(|err| RelayError::decode(format!("{keyspace}.{field}"), err)),
            })
            .collect()
    }

    /// Read and deserialize every field present under a keyspace.
    pub async fn get_all_fields(
        &self,
        keyspace: &str,
    ) -> Result<HashMap<String, Value>, RelayError> {
        let raw = self
            .publisher
            .get_hash_all(keyspace)
            .await
            .map_err(|err| store_error(keyspace, err))?;

        raw.into_iter()
            .map(|(field, raw)| {
                serde_json::from_str(&raw)
                    .map(|value| (field.clone(), value))
                    .map_err(|err| RelayError::decode(format!("{keyspace}.{field}"), err))
            })
            .collect()
    }

    /// Append a serialized value to `{keyspace}-{list}`, refreshing that
    /// key's TTL.
    pub async fn push_list_entry<T: Serialize>(
        &self,
        keyspace: &str,
        list: &str,
        value: &T,
    ) -> Result<(), RelayError> {
        let key = format!("{keyspace}-{list}");
        let raw =
            serde_json::to_string(value).map_err(|err| RelayError::encode(key.clone(), err))?;
        self.publisher
            .push_list(&key, &raw, self.expiration)
            .await
            .map_err(|err| store_error(&key, err))
    }
}

/// Keep codec errors as-is; wrap transport failures with the keyspace.
fn store_error(keyspace: &str, err: RelayError) -> RelayError {
    match err {
        codec @ (RelayError::Encode { .. } | RelayError::Decode { .. }) => codec,
        other => RelayError::store(keyspace, other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::transport::memory::MemoryBroker;

    fn store(broker: &MemoryBroker, ttl_secs: u64) -> KeyspaceStore {
        let (publisher, _subscriber) = broker.sessions();
        KeyspaceStore::new(publisher, Duration::from_secs(ttl_secs))
    }

    #[tokio::test]
    async fn fields_round_trip_and_absent_fields_are_none() {
        let broker = MemoryBroker::new();
        let store = store(&broker, 60);

        let fields = HashMap::from([
            ("a".to_string(), json!(1)),
            ("b".to_string(), json!("x")),
        ]);
        store.set_fields("ks1", &fields).await.unwrap();

        let values = store.get_fields("ks1", &["a", "b", "never_set"]).await.unwrap();
        assert_eq!(values, vec![Some(json!(1)), Some(json!("x")), None]);
    }

    #[tokio::test]
    async fn get_all_fields_returns_everything_written() {
        let broker = MemoryBroker::new();
        let store = store(&broker, 60);

        store
            .set_fields("ks1", &HashMap::from([("a".to_string(), json!([1, 2]))]))
            .await
            .unwrap();
        store
            .set_fields("ks1", &HashMap::from([("b".to_string(), json!(null))]))
            .await
            .unwrap();

        let all = store.get_all_fields("ks1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["a"], json!([1, 2]));
        assert_eq!(all["b"], json!(null));
    }

    #[tokio::test]
    async fn every_write_refreshes_the_ttl() {
        let broker = MemoryBroker::new();
        let store = store(&broker, 90);

        store
            .set_fields("ks1", &HashMap::from([("a".to_string(), json!(1))]))
            .await
            .unwrap();
        assert_eq!(broker.ttl_of("ks1"), Some(Duration::from_secs(90)));

        store.push_list_entry("ks1", "moves", &json!("e4")).await.unwrap();
        assert_eq!(broker.ttl_of("ks1-moves"), Some(Duration::from_secs(90)));
    }

    #[tokio::test]
    async fn list_entries_append_in_order() {
        let broker = MemoryBroker::new();
        let store = store(&broker, 60);

        store.push_list_entry("ks1", "moves", &json!(1)).await.unwrap();
        store.push_list_entry("ks1", "moves", &json!(2)).await.unwrap();

        assert_eq!(broker.list("ks1-moves"), vec!["1".to_string(), "2".to_string()]);
    }

    #[tokio::test]
    async fn getting_an_unwritten_keyspace_is_empty_not_an_error() {
        let broker = MemoryBroker::new();
        let store = store(&broker, 60);

        assert!(store.get_all_fields("ghost").await.unwrap().is_empty());
        assert_eq!(store.get_fields("ghost", &["a"]).await.unwrap(), vec![None]);
    }
}
