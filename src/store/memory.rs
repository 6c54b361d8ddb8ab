// src/store/memory.rs - In-process catalog used for offline runs and tests
use async_trait::async_trait;
use log::{debug, info};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tokio::sync::Mutex;

use super::{conflict, CatalogStore, Collection, Filter, StoreResult, WriteOp};
use crate::errors::StoreError;

type Documents = HashMap<Collection, BTreeMap<String, Value>>;

#[derive(Default)]
pub struct MemoryCatalog {
    documents: Mutex<Documents>,
    /// Commits that touch any of these document ids are rejected whole.
    poisoned_ids: Mutex<HashSet<String>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a snapshot of the form `{"venues": [{...}], "dishes": [...], ...}`.
    /// Unknown collection names are ignored.
    pub fn from_snapshot(snapshot: &Value) -> StoreResult<Self> {
        let mut documents: Documents = HashMap::new();
        if let Some(object) = snapshot.as_object() {
            for (name, docs) in object {
                let Some(collection) = Collection::from_name(name) else {
                    debug!("Snapshot: skipping unknown collection '{}'", name);
                    continue;
                };
                let entries = documents.entry(collection).or_default();
                for doc in docs.as_array().into_iter().flatten() {
                    let id = doc.get("id").and_then(Value::as_str).ok_or_else(|| {
                        StoreError::Rejected(format!("document without id in '{}'", name))
                    })?;
                    entries.insert(id.to_string(), doc.clone());
                }
            }
        }
        Ok(Self {
            documents: Mutex::new(documents),
            poisoned_ids: Mutex::new(HashSet::new()),
        })
    }

    pub fn from_snapshot_file(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            info!("Snapshot {} does not exist, starting with an empty catalog", path.display());
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path)?;
        let snapshot: Value = serde_json::from_str(&raw)?;
        let catalog = Self::from_snapshot(&snapshot)?;
        info!("Loaded catalog snapshot from {}", path.display());
        Ok(catalog)
    }

    pub async fn snapshot(&self) -> Value {
        let documents = self.documents.lock().await;
        let mut object = Map::new();
        for collection in Collection::ALL {
            let docs: Vec<Value> = documents
                .get(&collection)
                .map(|entries| entries.values().cloned().collect())
                .unwrap_or_default();
            object.insert(collection.as_str().to_string(), Value::Array(docs));
        }
        Value::Object(object)
    }

    pub async fn write_snapshot_file(&self, path: &Path) -> StoreResult<()> {
        let snapshot = self.snapshot().await;
        std::fs::write(path, serde_json::to_string_pretty(&snapshot)?)?;
        info!("Wrote catalog snapshot to {}", path.display());
        Ok(())
    }

    /// Makes every later commit touching `id` fail.
    pub async fn poison(&self, id: &str) {
        self.poisoned_ids.lock().await.insert(id.to_string());
    }

    pub async fn count(&self, collection: Collection) -> usize {
        self.documents
            .lock()
            .await
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Value>> {
        let documents = self.documents.lock().await;
        Ok(documents
            .get(&collection)
            .and_then(|entries| entries.get(id))
            .cloned())
    }

    async fn query(&self, collection: Collection, filters: &[Filter]) -> StoreResult<Vec<Value>> {
        let documents = self.documents.lock().await;
        Ok(documents
            .get(&collection)
            .map(|entries| {
                entries
                    .values()
                    .filter(|doc| filters.iter().all(|f| f.matches(doc)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn commit(&self, writes: Vec<WriteOp>) -> StoreResult<()> {
        let poisoned = self.poisoned_ids.lock().await;
        if let Some(op) = writes.iter().find(|op| poisoned.contains(op.target().1)) {
            let (collection, id) = op.target();
            return Err(StoreError::Rejected(format!(
                "write to {}/{} refused",
                collection.as_str(),
                id
            )));
        }
        drop(poisoned);

        let mut documents = self.documents.lock().await;
        for op in &writes {
            if let WriteOp::Expect { collection, id, doc } = op {
                let current = documents.get(collection).and_then(|entries| entries.get(id));
                if current != doc.as_ref() {
                    return Err(conflict(*collection, id));
                }
            }
        }
        for op in writes {
            match op {
                WriteOp::Put { collection, id, doc } => {
                    documents.entry(collection).or_default().insert(id, doc);
                }
                WriteOp::Delete { collection, id } => {
                    if let Some(entries) = documents.get_mut(&collection) {
                        entries.remove(&id);
                    }
                }
                WriteOp::Expect { .. } => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_poisoned_commit_applies_nothing() {
        let store = MemoryCatalog::new();
        store.poison("bad").await;
        let result = store
            .commit(vec![
                WriteOp::Put {
                    collection: Collection::Venues,
                    id: "good".into(),
                    doc: json!({"id": "good"}),
                },
                WriteOp::Put {
                    collection: Collection::Venues,
                    id: "bad".into(),
                    doc: json!({"id": "bad"}),
                },
            ])
            .await;
        assert!(result.is_err());
        assert_eq!(store.count(Collection::Venues).await, 0);
    }

    #[tokio::test]
    async fn test_snapshot_loads_and_filters() {
        let store = MemoryCatalog::from_snapshot(&json!({
            "venues": [
                {"id": "v1", "status": "active"},
                {"id": "v2", "status": "archived"}
            ],
            "unknown": [{"id": "x"}]
        }))
        .unwrap();
        let active = store
            .query(Collection::Venues, &[Filter::eq("status", "active")])
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0]["id"], "v1");

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot["venues"].as_array().unwrap().len(), 2);
        assert_eq!(snapshot["dishes"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_stale_expectation_rejects_whole_batch() {
        let store = MemoryCatalog::new();
        store
            .put(Collection::Venues, "v1", json!({"id": "v1", "name": "Old"}))
            .await
            .unwrap();
        store
            .put(Collection::Venues, "v1", json!({"id": "v1", "name": "Renamed"}))
            .await
            .unwrap();

        let result = store
            .commit(vec![
                WriteOp::Expect {
                    collection: Collection::Venues,
                    id: "v1".into(),
                    doc: Some(json!({"id": "v1", "name": "Old"})),
                },
                WriteOp::Put {
                    collection: Collection::Dishes,
                    id: "d1".into(),
                    doc: json!({"id": "d1", "venueId": "v1"}),
                },
            ])
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(store.count(Collection::Dishes).await, 0);

        let absent = store
            .commit(vec![WriteOp::Expect {
                collection: Collection::Venues,
                id: "v1".into(),
                doc: None,
            }])
            .await;
        assert!(matches!(absent, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn test_snapshot_rejects_documents_without_id() {
        let result = MemoryCatalog::from_snapshot(&json!({"venues": [{"name": "x"}]}));
        assert!(result.is_err());
    }
}
