/// In-memory document store
///
/// Keeps every collection in a `BTreeMap` behind a tokio `RwLock`. Used by the
/// test suites and by the API server when no `DATABASE_URL` is configured.
///
/// Server timestamps come from a monotonic clock: every stamped write gets a
/// timestamp strictly greater than the previous one, so ordering by creation
/// time is total even for writes within the same microsecond.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{Map, Value as JsonValue};
use tokio::sync::{Mutex, RwLock};

use super::{
    compare_values, generate_document_id, Direction, Document, DocumentStore, Fields, Query,
    StoreError, StoreResult,
};

type Collection = BTreeMap<String, Map<String, JsonValue>>;

/// In-process [`DocumentStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    last_timestamp: Mutex<Option<DateTime<Utc>>>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates losing connectivity: every operation fails with
    /// [`StoreError::Unavailable`] until switched back
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Number of documents in a collection
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    async fn next_timestamp(&self) -> String {
        let mut last = self.last_timestamp.lock().await;
        let mut now = Utc::now();
        if let Some(prev) = *last {
            if now <= prev {
                now = prev + Duration::microseconds(1);
            }
        }
        *last = Some(now);
        now.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    async fn apply(&self, target: &mut Map<String, JsonValue>, fields: Fields) {
        for (key, value) in fields.values() {
            target.insert(key.clone(), value.clone());
        }
        for key in fields.server_timestamp_fields() {
            let stamp = self.next_timestamp().await;
            target.insert(key.clone(), JsonValue::String(stamp));
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.check_online()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        self.check_online()?;
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<Document> = docs
            .iter()
            .filter(|(_, data)| query.matches(data))
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect();

        if let Some(order) = &query.order_by {
            results.sort_by(|a, b| {
                let ordering = match (a.get(&order.field), b.get(&order.field)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(std::cmp::Ordering::Equal),
                    _ => std::cmp::Ordering::Equal,
                };
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        Ok(results)
    }

    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<Document> {
        let id = generate_document_id();
        self.set(collection, &id, fields).await
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<Document> {
        self.check_online()?;
        let mut data = Map::new();
        self.apply(&mut data, fields).await;

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data.clone());

        Ok(Document {
            id: id.to_string(),
            data,
        })
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<Document> {
        self.check_online()?;
        let mut collections = self.collections.write().await;
        let data = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        self.apply(data, fields).await;

        Ok(Document {
            id: id.to_string(),
            data: data.clone(),
        })
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        self.check_online()?;
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .map(|docs| docs.remove(id).is_some())
            .unwrap_or(false))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_online()
    }
}
