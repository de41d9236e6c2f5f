use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, Weak};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CoreError;

use super::query::{BatchOp, Document, Filter};
use super::traits::{ChangeCallback, DocumentStore, Subscription};

type Collection = BTreeMap<String, Value>;

/// Plain copy of every collection, used for encrypted snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub collections: BTreeMap<String, Collection>,
}

impl StoreSnapshot {
    /// Total number of documents across all collections.
    pub fn document_count(&self) -> usize {
        self.collections.values().map(BTreeMap::len).sum()
    }
}

struct Subscriber {
    id: u64,
    collection: String,
    filter: Filter,
    on_change: ChangeCallback,
}

#[derive(Default)]
struct Inner {
    collections: BTreeMap<String, Collection>,
    subscribers: Vec<Subscriber>,
    next_subscriber_id: u64,
}

impl Inner {
    fn snapshot_of(&self, collection: &str, filter: &Filter) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|docs| matching(docs, filter))
            .unwrap_or_default()
    }
}

/// In-process document store.
///
/// Batches are staged on copies of the touched collections and swapped in
/// only after every operation applied cleanly, so readers never observe a
/// partial batch. Subscribers are notified after the lock is released.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("MemoryStore");
        if let Ok(inner) = self.inner.read() {
            s.field("collections", &inner.collections.len())
                .field("subscribers", &inner.subscribers.len());
        }
        s.finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated from a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let inner = Inner {
            collections: snapshot.collections,
            ..Inner::default()
        };
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    /// Copy out every collection.
    pub fn snapshot(&self) -> Result<StoreSnapshot, CoreError> {
        let inner = self.read()?;
        Ok(StoreSnapshot {
            collections: inner.collections.clone(),
        })
    }

    /// Number of documents in a collection.
    pub fn document_count(&self, collection: &str) -> Result<usize, CoreError> {
        let inner = self.read()?;
        Ok(inner.collections.get(collection).map_or(0, BTreeMap::len))
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> Result<usize, CoreError> {
        Ok(self.read()?.subscribers.len())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, CoreError> {
        self.inner
            .read()
            .map_err(|_| CoreError::Store("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, CoreError> {
        self.inner
            .write()
            .map_err(|_| CoreError::Store("memory store lock poisoned".into()))
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn batch_write(&self, ops: Vec<BatchOp>) -> Result<(), CoreError> {
        if ops.is_empty() {
            return Ok(());
        }

        let notifications = {
            let mut inner = self.write()?;

            let mut staged: BTreeMap<String, Collection> = BTreeMap::new();
            for op in &ops {
                let name = op.collection();
                if name.is_empty() || op.id().is_empty() {
                    return Err(CoreError::Store(
                        "batch operation needs a collection path and a document id".into(),
                    ));
                }
                let docs = staged
                    .entry(name.to_string())
                    .or_insert_with(|| inner.collections.get(name).cloned().unwrap_or_default());
                apply(docs, op)?;
            }

            let touched: BTreeSet<String> = staged.keys().cloned().collect();
            for (name, docs) in staged {
                inner.collections.insert(name, docs);
            }

            tracing::debug!(
                store = "memory",
                ops = ops.len(),
                collections = touched.len(),
                "committed batch"
            );

            inner
                .subscribers
                .iter()
                .filter(|s| touched.contains(&s.collection))
                .map(|s| {
                    (
                        Arc::clone(&s.on_change),
                        inner.snapshot_of(&s.collection, &s.filter),
                    )
                })
                .collect::<Vec<_>>()
        };

        for (on_change, docs) in notifications {
            on_change(&docs);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, CoreError> {
        let inner = self.read()?;
        Ok(inner.snapshot_of(collection, filter))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, CoreError> {
        let inner = self.read()?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    fn subscribe(
        &self,
        collection: &str,
        filter: Filter,
        on_change: ChangeCallback,
    ) -> Result<Subscription, CoreError> {
        let (id, initial) = {
            let mut inner = self.write()?;
            let id = inner.next_subscriber_id;
            inner.next_subscriber_id += 1;
            let initial = inner.snapshot_of(collection, &filter);
            inner.subscribers.push(Subscriber {
                id,
                collection: collection.to_string(),
                filter,
                on_change: Arc::clone(&on_change),
            });
            (id, initial)
        };

        on_change(&initial);

        let weak: Weak<RwLock<Inner>> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                if let Ok(mut inner) = inner.write() {
                    inner.subscribers.retain(|s| s.id != id);
                }
            }
        }))
    }
}

fn matching(docs: &Collection, filter: &Filter) -> Vec<Document> {
    docs.iter()
        .map(|(id, data)| Document::new(id.clone(), data.clone()))
        .filter(|doc| filter.matches(doc))
        .collect()
}

fn apply(docs: &mut Collection, op: &BatchOp) -> Result<(), CoreError> {
    match op {
        BatchOp::Set { id, data, .. } => {
            if !data.is_object() {
                return Err(CoreError::Store(format!(
                    "set '{id}': document body must be an object"
                )));
            }
            docs.insert(id.clone(), data.clone());
        }
        BatchOp::Update {
            collection,
            id,
            data,
        } => {
            let Value::Object(changes) = data else {
                return Err(CoreError::Store(format!(
                    "update '{id}': update body must be an object"
                )));
            };
            let Some(Value::Object(existing)) = docs.get_mut(id) else {
                return Err(CoreError::Store(format!(
                    "update '{collection}/{id}': document does not exist"
                )));
            };
            for (field, value) in changes {
                if value.is_null() {
                    existing.remove(field);
                } else {
                    existing.insert(field.clone(), value.clone());
                }
            }
        }
        BatchOp::Delete { id, .. } => {
            docs.remove(id);
        }
    }
    Ok(())
}
