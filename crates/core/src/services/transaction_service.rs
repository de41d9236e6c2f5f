use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::identity::UserId;
use crate::models::request::{GroupEdit, TransactionEdit, TransactionRequest};
use crate::models::settings::{OriginalDeletionPolicy, Settings};
use crate::models::transaction::{Payment, Transaction, TransactionFilter};
use crate::store::{transactions_path, BatchOp, Document, DocumentStore, Filter};

use super::group_engine::{validate_total, GroupEngine};
use super::{query_transactions, require_category, require_credit_card, sort_transactions};

/// Creates, edits and deletes transactions and transaction groups.
///
/// Every mutation is a single `batch_write`, so a group is either fully
/// written, fully updated, or untouched.
pub struct TransactionService {
    store: Arc<dyn DocumentStore>,
    engine: GroupEngine,
    original_policy: OriginalDeletionPolicy,
}

impl TransactionService {
    pub fn new(store: Arc<dyn DocumentStore>, settings: &Settings) -> Self {
        Self {
            store,
            engine: GroupEngine::from_settings(settings),
            original_policy: settings.original_deletion_policy,
        }
    }

    /// Expand a request and write every resulting transaction in one batch.
    /// Returns the persisted transactions, oldest first.
    pub async fn add(
        &self,
        user: &UserId,
        request: &TransactionRequest,
    ) -> Result<Vec<Transaction>, CoreError> {
        let drafts = self.engine.expand(request)?;

        let store = self.store.as_ref();
        require_category(store, user, &request.category_id).await?;
        if let Some(Payment::CreditCard(card)) = &request.payment {
            require_credit_card(store, user, card).await?;
        }

        let collection = transactions_path(user);
        let mut created = Vec::with_capacity(drafts.len());
        let mut ops = Vec::with_capacity(drafts.len());
        for draft in drafts {
            draft.validate()?;
            let tx = Transaction::from_draft(Uuid::new_v4().to_string(), draft);
            ops.push(BatchOp::set(&collection, &tx.id, Document::encode(&tx)?));
            created.push(tx);
        }

        self.store.batch_write(ops).await?;

        if let Some(group_id) = created.first().and_then(|t| t.group_id.as_deref()) {
            tracing::info!(user = %user, group_id, members = created.len(), "created transaction group");
        }
        Ok(created)
    }

    /// Fetch one transaction by id.
    pub async fn get(&self, user: &UserId, id: &str) -> Result<Transaction, CoreError> {
        self.store
            .get(&transactions_path(user), id)
            .await?
            .ok_or_else(|| CoreError::transaction_not_found(id))?
            .decode()
    }

    /// List transactions matching `filter`, ordered by date.
    pub async fn list(
        &self,
        user: &UserId,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, CoreError> {
        // Push the equality parts down to the store, range checks stay local.
        let mut clauses = Vec::new();
        if let Some(group_id) = &filter.group_id {
            clauses.push(Filter::eq("groupId", group_id.as_str()));
        }
        if let Some(category_id) = &filter.category_id {
            clauses.push(Filter::eq("categoryId", category_id.as_str()));
        }
        let store_filter = match clauses.len() {
            0 => Filter::All,
            _ => Filter::And(clauses),
        };

        let mut transactions: Vec<Transaction> =
            query_transactions(self.store.as_ref(), user, &store_filter)
                .await?
                .into_iter()
                .filter(|tx| filter.matches(tx))
                .collect();
        sort_transactions(&mut transactions);
        Ok(transactions)
    }

    /// All members of a group, ordered by date.
    pub async fn group_members(
        &self,
        user: &UserId,
        group_id: &str,
    ) -> Result<Vec<Transaction>, CoreError> {
        let mut members =
            query_transactions(self.store.as_ref(), user, &Filter::eq("groupId", group_id)).await?;
        sort_transactions(&mut members);
        Ok(members)
    }

    /// Apply `edit` to exactly one transaction.
    ///
    /// The amount sign is recomputed from the resulting type; switching to
    /// cash clears the credit card. Group membership is left as is.
    pub async fn edit_single(
        &self,
        user: &UserId,
        id: &str,
        edit: &TransactionEdit,
    ) -> Result<Transaction, CoreError> {
        let mut tx = self.get(user, id).await?;
        let store = self.store.as_ref();

        if let Some(description) = &edit.description {
            let description = description.trim();
            if description.is_empty() {
                return Err(CoreError::ValidationError(
                    "Description must not be empty".into(),
                ));
            }
            tx.description = description.to_string();
        }

        if let Some(kind) = edit.kind {
            tx.kind = kind;
        }
        let magnitude = match edit.amount {
            Some(amount) => {
                let magnitude = amount.abs();
                validate_total(magnitude)?;
                magnitude
            }
            None => tx.magnitude(),
        };
        tx.amount = tx.kind.signed(magnitude);

        if let Some(category_id) = &edit.category_id {
            if category_id != &tx.category_id {
                require_category(store, user, category_id).await?;
            }
            tx.category_id = category_id.clone();
        }

        if let Some(date) = edit.date {
            tx.date = date;
        }

        if let Some(payment) = &edit.payment {
            if let Payment::CreditCard(card) = payment {
                require_credit_card(store, user, card).await?;
            }
            tx.payment_method = Some(payment.method());
            tx.credit_card_id = payment.credit_card_id().map(str::to_string);
        }

        tx.validate()?;

        let collection = transactions_path(user);
        self.store
            .batch_write(vec![BatchOp::set(&collection, &tx.id, Document::encode(&tx)?)])
            .await?;
        Ok(tx)
    }

    /// Propagate category and payment changes to every member of a group.
    ///
    /// Description, amount and date stay per-member. An unknown group id is
    /// not an error: nothing is written and 0 is returned.
    pub async fn edit_group(
        &self,
        user: &UserId,
        group_id: &str,
        edit: &GroupEdit,
    ) -> Result<usize, CoreError> {
        if edit.is_empty() {
            return Ok(0);
        }

        let store = self.store.as_ref();
        if let Some(category_id) = &edit.category_id {
            require_category(store, user, category_id).await?;
        }
        if let Some(Payment::CreditCard(card)) = &edit.payment {
            require_credit_card(store, user, card).await?;
        }

        let members = self.group_members(user, group_id).await?;
        if members.is_empty() {
            tracing::debug!(user = %user, group_id, "group edit matched no transactions");
            return Ok(0);
        }

        let changes = group_changes(edit);
        let collection = transactions_path(user);
        let ops = members
            .iter()
            .map(|tx| BatchOp::update(&collection, &tx.id, changes.clone()))
            .collect();
        self.store.batch_write(ops).await?;

        tracing::info!(user = %user, group_id, members = members.len(), "updated transaction group");
        Ok(members.len())
    }

    /// Delete exactly one transaction. Other group members are kept.
    ///
    /// Deleting a group's original member follows the configured
    /// `OriginalDeletionPolicy`.
    pub async fn delete_single(&self, user: &UserId, id: &str) -> Result<(), CoreError> {
        let tx = self.get(user, id).await?;
        let collection = transactions_path(user);
        let mut ops = vec![BatchOp::delete(&collection, &tx.id)];

        if let (true, Some(group_id)) = (tx.is_original_member(), tx.group_id.as_deref()) {
            match self.original_policy {
                OriginalDeletionPolicy::Allow => {}
                OriginalDeletionPolicy::Forbid => {
                    let others = self.remaining_members(user, group_id, &tx.id).await?;
                    if !others.is_empty() {
                        tracing::warn!(user = %user, group_id, "refused to delete original group member");
                        return Err(CoreError::ValidationError(format!(
                            "Transaction '{}' is the original of group '{group_id}' and cannot be deleted while {} other member(s) remain",
                            tx.id,
                            others.len()
                        )));
                    }
                }
                OriginalDeletionPolicy::Promote => {
                    let others = self.remaining_members(user, group_id, &tx.id).await?;
                    if let Some(successor) = others.first() {
                        ops.push(BatchOp::update(
                            &collection,
                            &successor.id,
                            json!({ "isOriginal": true }),
                        ));
                        tracing::info!(user = %user, group_id, successor = %successor.id, "promoted new original group member");
                    }
                }
            }
        }

        self.store.batch_write(ops).await
    }

    /// Delete every member of a group in one batch. Returns how many were removed.
    pub async fn delete_group(&self, user: &UserId, group_id: &str) -> Result<usize, CoreError> {
        let members = self.group_members(user, group_id).await?;
        if members.is_empty() {
            return Ok(0);
        }

        let collection = transactions_path(user);
        let ops = members
            .iter()
            .map(|tx| BatchOp::delete(&collection, &tx.id))
            .collect();
        self.store.batch_write(ops).await?;

        tracing::info!(user = %user, group_id, members = members.len(), "deleted transaction group");
        Ok(members.len())
    }

    /// Group members other than `excluded_id`, ordered by date.
    async fn remaining_members(
        &self,
        user: &UserId,
        group_id: &str,
        excluded_id: &str,
    ) -> Result<Vec<Transaction>, CoreError> {
        let mut members = self.group_members(user, group_id).await?;
        members.retain(|m| m.id != excluded_id);
        Ok(members)
    }
}

/// Update body for a group edit. Cash writes `null` to drop `creditCardId`.
fn group_changes(edit: &GroupEdit) -> Value {
    let mut changes = serde_json::Map::new();
    if let Some(category_id) = &edit.category_id {
        changes.insert("categoryId".into(), Value::String(category_id.clone()));
    }
    if let Some(payment) = &edit.payment {
        changes.insert("paymentMethod".into(), json!(payment.method()));
        changes.insert(
            "creditCardId".into(),
            payment
                .credit_card_id()
                .map_or(Value::Null, |card| Value::String(card.to_string())),
        );
    }
    Value::Object(changes)
}
