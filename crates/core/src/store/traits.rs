use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::CoreError;

use super::query::{BatchOp, Document, Filter};

/// Callback invoked with the full filtered snapshot of a collection.
pub type ChangeCallback = Arc<dyn Fn(&[Document]) + Send + Sync>;

/// Trait abstraction for the document database the tracker persists into.
///
/// A hosted document database, a REST backend, or the in-process
/// `MemoryStore` implement this trait. Services only ever talk to it
/// through atomic batches and filtered queries.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait DocumentStore: Send + Sync {
    /// Human-readable name of this store (for logs/errors).
    fn name(&self) -> &str;

    /// Apply every operation or none of them.
    async fn batch_write(&self, ops: Vec<BatchOp>) -> Result<(), CoreError>;

    /// Return the documents of a collection that match `filter`, ordered by id.
    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, CoreError>;

    /// Fetch one document by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, CoreError>;

    /// Register a live view over a collection.
    ///
    /// `on_change` receives the current snapshot right away and again after
    /// every committed batch that touches the collection. The view stays
    /// registered until the returned `Subscription` is dropped.
    fn subscribe(
        &self,
        collection: &str,
        filter: Filter,
        on_change: ChangeCallback,
    ) -> Result<Subscription, CoreError>;
}

/// Handle for a live subscription. Dropping it unsubscribes.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop receiving updates.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
