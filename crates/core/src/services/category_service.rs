use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::identity::UserId;
use crate::models::category::{Category, CategoryInput};
use crate::models::settings::Settings;
use crate::store::{categories_path, transactions_path, BatchOp, Document, DocumentStore, Filter};

/// Manages a user's categories.
///
/// Deleting a category moves its transactions to the fallback category in
/// the same batch, so no transaction ever points at a missing category.
pub struct CategoryService {
    store: Arc<dyn DocumentStore>,
    fallback_id: String,
    fallback_name: String,
}

impl CategoryService {
    pub fn new(store: Arc<dyn DocumentStore>, settings: &Settings) -> Self {
        Self {
            store,
            fallback_id: settings.fallback_category_id.clone(),
            fallback_name: settings.fallback_category_name.clone(),
        }
    }

    /// All categories, sorted by name (case-insensitive).
    pub async fn list(&self, user: &UserId) -> Result<Vec<Category>, CoreError> {
        let mut categories = self
            .store
            .query(&categories_path(user), &Filter::All)
            .await?
            .iter()
            .map(|doc| doc.decode::<Category>())
            .collect::<Result<Vec<_>, _>>()?;
        categories.sort_by_key(|c| c.name.to_lowercase());
        Ok(categories)
    }

    pub async fn get(&self, user: &UserId, id: &str) -> Result<Category, CoreError> {
        self.store
            .get(&categories_path(user), id)
            .await?
            .ok_or_else(|| CoreError::category_not_found(id))?
            .decode()
    }

    /// Create a category with a generated id.
    pub async fn add(&self, user: &UserId, input: &CategoryInput) -> Result<Category, CoreError> {
        let id = Uuid::new_v4().to_string();
        self.put(user, id, input).await
    }

    /// Create a category under a caller-chosen id (e.g. seeded defaults).
    pub async fn add_with_id(
        &self,
        user: &UserId,
        id: &str,
        input: &CategoryInput,
    ) -> Result<Category, CoreError> {
        if id.trim().is_empty() || id.contains('/') {
            return Err(CoreError::ValidationError(format!(
                "Invalid category id '{id}'"
            )));
        }
        if self.store.get(&categories_path(user), id).await?.is_some() {
            return Err(CoreError::ValidationError(format!(
                "Category '{id}' already exists"
            )));
        }
        self.put(user, id.to_string(), input).await
    }

    /// Replace a category's name, type and color.
    pub async fn update(
        &self,
        user: &UserId,
        id: &str,
        input: &CategoryInput,
    ) -> Result<Category, CoreError> {
        self.get(user, id).await?;
        self.put(user, id.to_string(), input).await
    }

    /// Delete a category, reassigning its transactions to the fallback
    /// category in the same batch. Returns how many transactions moved.
    pub async fn delete(&self, user: &UserId, id: &str) -> Result<usize, CoreError> {
        if id == self.fallback_id {
            return Err(CoreError::ValidationError(format!(
                "The fallback category '{id}' cannot be deleted"
            )));
        }

        let categories = categories_path(user);
        if self.store.get(&categories, id).await?.is_none() {
            return Err(CoreError::category_not_found(id));
        }

        let transactions = transactions_path(user);
        let affected = self
            .store
            .query(&transactions, &Filter::eq("categoryId", id))
            .await?;

        let mut ops: Vec<BatchOp> = affected
            .iter()
            .map(|doc| {
                BatchOp::update(
                    &transactions,
                    &doc.id,
                    json!({ "categoryId": self.fallback_id }),
                )
            })
            .collect();

        if !affected.is_empty() && self.store.get(&categories, &self.fallback_id).await?.is_none() {
            let fallback = Category::new(&self.fallback_id, &self.fallback_name);
            ops.push(BatchOp::set(&categories, &self.fallback_id, Document::encode(&fallback)?));
        }
        ops.push(BatchOp::delete(&categories, id));

        self.store.batch_write(ops).await?;

        tracing::info!(
            user = %user,
            category = id,
            reassigned = affected.len(),
            fallback = %self.fallback_id,
            "deleted category"
        );
        Ok(affected.len())
    }

    /// Create the fallback category if it does not exist yet.
    pub async fn ensure_fallback(&self, user: &UserId) -> Result<Category, CoreError> {
        let categories = categories_path(user);
        if let Some(doc) = self.store.get(&categories, &self.fallback_id).await? {
            return doc.decode();
        }
        let fallback = Category::new(&self.fallback_id, &self.fallback_name);
        self.store
            .batch_write(vec![BatchOp::set(
                &categories,
                &self.fallback_id,
                Document::encode(&fallback)?,
            )])
            .await?;
        Ok(fallback)
    }

    async fn put(
        &self,
        user: &UserId,
        id: String,
        input: &CategoryInput,
    ) -> Result<Category, CoreError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(CoreError::ValidationError(
                "Category name must not be empty".into(),
            ));
        }

        let category = Category {
            id,
            name: name.to_string(),
            kind: input.kind,
            color: input.color.clone(),
        };
        self.store
            .batch_write(vec![BatchOp::set(
                categories_path(user),
                &category.id,
                Document::encode(&category)?,
            )])
            .await?;
        Ok(category)
    }
}
