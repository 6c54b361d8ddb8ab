// src/store/mod.rs - Catalog store collaborator: documents, predicate queries, atomic commits
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::StoreError;

pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Venues,
    Dishes,
    DiscoveredVenues,
    DiscoveredDishes,
    SyncHistory,
    MergeHistory,
    Changelog,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Venues,
        Collection::Dishes,
        Collection::DiscoveredVenues,
        Collection::DiscoveredDishes,
        Collection::SyncHistory,
        Collection::MergeHistory,
        Collection::Changelog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Venues => "venues",
            Collection::Dishes => "dishes",
            Collection::DiscoveredVenues => "discovered_venues",
            Collection::DiscoveredDishes => "discovered_dishes",
            Collection::SyncHistory => "sync_history",
            Collection::MergeHistory => "merge_history",
            Collection::Changelog => "changelog",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

/// Equality predicate on a top-level document field (camelCase JSON name).
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: &'static str,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    pub fn matches(&self, doc: &Value) -> bool {
        doc.get(self.field) == Some(&self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put {
        collection: Collection,
        id: String,
        doc: Value,
    },
    Delete {
        collection: Collection,
        id: String,
    },
    /// Precondition: the stored document must still equal `doc` (`None` = absent)
    /// when the batch is applied, or the whole commit fails with a conflict.
    Expect {
        collection: Collection,
        id: String,
        doc: Option<Value>,
    },
}

impl WriteOp {
    pub fn target(&self) -> (Collection, &str) {
        match self {
            WriteOp::Put { collection, id, .. }
            | WriteOp::Delete { collection, id }
            | WriteOp::Expect { collection, id, .. } => (*collection, id.as_str()),
        }
    }
}

pub(crate) fn conflict(collection: Collection, id: &str) -> StoreError {
    StoreError::Conflict(format!(
        "{}/{} changed since it was read",
        collection.as_str(),
        id
    ))
}

/// Document store used by the reconciliation core. Implementations only need
/// single-document reads, predicate queries, and all-or-nothing batch commits.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Value>>;

    /// Documents matching every filter. An empty filter list returns the whole collection.
    async fn query(&self, collection: Collection, filters: &[Filter]) -> StoreResult<Vec<Value>>;

    /// Applies every write or none of them. `Expect` entries are checked
    /// against the stored state before anything is written.
    async fn commit(&self, writes: Vec<WriteOp>) -> StoreResult<()>;

    async fn put(&self, collection: Collection, id: &str, doc: Value) -> StoreResult<()> {
        self.commit(vec![WriteOp::Put {
            collection,
            id: id.to_string(),
            doc,
        }])
        .await
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        self.commit(vec![WriteOp::Delete {
            collection,
            id: id.to_string(),
        }])
        .await
    }

    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Write buffer scoped to one unit of work. Reads see the buffer's own pending
/// writes; nothing reaches the store until `commit`, and dropping discards it.
/// Documents fetched with `get` are re-checked at commit, so a concurrent
/// change to any of them fails the commit instead of being overwritten.
pub struct Transaction<'a> {
    store: &'a dyn CatalogStore,
    writes: Vec<WriteOp>,
    pending: HashMap<(Collection, String), Option<Value>>,
    reads: HashMap<(Collection, String), Option<Value>>,
}

impl<'a> Transaction<'a> {
    pub fn begin(store: &'a dyn CatalogStore) -> Self {
        Self {
            store,
            writes: Vec::new(),
            pending: HashMap::new(),
            reads: HashMap::new(),
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &mut self,
        collection: Collection,
        id: &str,
    ) -> StoreResult<Option<T>> {
        let key = (collection, id.to_string());
        let raw = match self.pending.get(&key) {
            Some(staged) => staged.clone(),
            None => {
                let stored = self.store.get(collection, id).await?;
                self.reads.entry(key).or_insert_with(|| stored.clone());
                stored
            }
        };
        raw.map(serde_json::from_value).transpose().map_err(Into::into)
    }

    pub async fn query<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> StoreResult<Vec<T>> {
        let stored = self.store.query(collection, filters).await?;
        let mut docs: Vec<Value> = Vec::with_capacity(stored.len());
        for doc in stored {
            let staged = doc_id(&doc)
                .map_or(false, |id| self.pending.contains_key(&(collection, id)));
            if !staged {
                docs.push(doc);
            }
        }
        for ((coll, _), staged) in &self.pending {
            if *coll != collection {
                continue;
            }
            if let Some(doc) = staged {
                if filters.iter().all(|f| f.matches(doc)) {
                    docs.push(doc.clone());
                }
            }
        }
        docs.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(Into::into)
    }

    pub fn put<T: Serialize>(&mut self, collection: Collection, id: &str, doc: &T) -> StoreResult<()> {
        let value = serde_json::to_value(doc)?;
        self.pending
            .insert((collection, id.to_string()), Some(value.clone()));
        self.writes.push(WriteOp::Put {
            collection,
            id: id.to_string(),
            doc: value,
        });
        Ok(())
    }

    pub fn delete(&mut self, collection: Collection, id: &str) {
        self.pending.insert((collection, id.to_string()), None);
        self.writes.push(WriteOp::Delete {
            collection,
            id: id.to_string(),
        });
    }

    pub fn new_id(&self) -> String {
        self.store.new_id()
    }

    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    pub async fn commit(self) -> StoreResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        let mut batch: Vec<WriteOp> = self
            .reads
            .into_iter()
            .map(|((collection, id), doc)| WriteOp::Expect { collection, id, doc })
            .collect();
        batch.extend(self.writes);
        self.store.commit(batch).await
    }
}

fn doc_id(doc: &Value) -> Option<String> {
    doc.get("id").and_then(Value::as_str).map(str::to_string)
}

pub async fn fetch<T: DeserializeOwned>(
    store: &dyn CatalogStore,
    collection: Collection,
    id: &str,
) -> StoreResult<Option<T>> {
    store
        .get(collection, id)
        .await?
        .map(serde_json::from_value)
        .transpose()
        .map_err(Into::into)
}

pub async fn fetch_where<T: DeserializeOwned>(
    store: &dyn CatalogStore,
    collection: Collection,
    filters: &[Filter],
) -> StoreResult<Vec<T>> {
    store
        .query(collection, filters)
        .await?
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(Into::into)
}

pub async fn save<T: Serialize + Sync>(
    store: &dyn CatalogStore,
    collection: Collection,
    id: &str,
    doc: &T,
) -> StoreResult<()> {
    store.put(collection, id, serde_json::to_value(doc)?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_transaction_reads_its_own_writes() {
        let store = MemoryCatalog::new();
        store
            .put(Collection::Dishes, "d1", json!({"id": "d1", "venueId": "v1", "name": "Bowl"}))
            .await
            .unwrap();

        let mut tx = Transaction::begin(&store);
        tx.put(
            Collection::Dishes,
            "d2",
            &json!({"id": "d2", "venueId": "v1", "name": "Wrap"}),
        )
        .unwrap();
        tx.delete(Collection::Dishes, "d1");

        let seen: Vec<Value> = tx
            .query(Collection::Dishes, &[Filter::eq("venueId", "v1")])
            .await
            .unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["id"], "d2");
        assert!(tx.get::<Value>(Collection::Dishes, "d1").await.unwrap().is_none());

        // Nothing visible outside the transaction until commit.
        assert!(store.get(Collection::Dishes, "d2").await.unwrap().is_none());
        tx.commit().await.unwrap();
        assert!(store.get(Collection::Dishes, "d2").await.unwrap().is_some());
        assert!(store.get(Collection::Dishes, "d1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = MemoryCatalog::new();
        {
            let mut tx = Transaction::begin(&store);
            tx.put(Collection::Venues, "v1", &json!({"id": "v1"})).unwrap();
        }
        assert!(store.get(Collection::Venues, "v1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_fails_when_a_read_document_changed() {
        let store = MemoryCatalog::new();
        store
            .put(Collection::DiscoveredVenues, "dv1", json!({"id": "dv1", "status": "verified"}))
            .await
            .unwrap();

        let mut tx = Transaction::begin(&store);
        let seen: Option<Value> = tx.get(Collection::DiscoveredVenues, "dv1").await.unwrap();
        assert_eq!(seen.unwrap()["status"], "verified");
        tx.put(Collection::Venues, "v1", &json!({"id": "v1"})).unwrap();

        store
            .put(Collection::DiscoveredVenues, "dv1", json!({"id": "dv1", "status": "promoted"}))
            .await
            .unwrap();

        let result = tx.commit().await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert!(store.get(Collection::Venues, "v1").await.unwrap().is_none());
    }

    #[test]
    fn test_collection_names_round_trip() {
        for c in Collection::ALL {
            assert_eq!(Collection::from_name(c.as_str()), Some(c));
        }
        assert_eq!(Collection::from_name("nope"), None);
    }
}
