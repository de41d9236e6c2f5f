use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::identity::UserId;
use crate::models::credit_card::{CreditCard, CreditCardInput};
use crate::models::transaction::PaymentMethod;
use crate::store::{credit_cards_path, transactions_path, BatchOp, Document, DocumentStore, Filter};

/// Manages a user's credit cards.
pub struct CreditCardService {
    store: Arc<dyn DocumentStore>,
}

impl CreditCardService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// All cards, sorted by name.
    pub async fn list(&self, user: &UserId) -> Result<Vec<CreditCard>, CoreError> {
        let mut cards = self
            .store
            .query(&credit_cards_path(user), &Filter::All)
            .await?
            .iter()
            .map(|doc| doc.decode::<CreditCard>())
            .collect::<Result<Vec<_>, _>>()?;
        cards.sort_by_key(|c| c.name.to_lowercase());
        Ok(cards)
    }

    pub async fn get(&self, user: &UserId, id: &str) -> Result<CreditCard, CoreError> {
        self.store
            .get(&credit_cards_path(user), id)
            .await?
            .ok_or_else(|| CoreError::credit_card_not_found(id))?
            .decode()
    }

    pub async fn add(&self, user: &UserId, input: &CreditCardInput) -> Result<CreditCard, CoreError> {
        self.put(user, Uuid::new_v4().to_string(), input).await
    }

    pub async fn update(
        &self,
        user: &UserId,
        id: &str,
        input: &CreditCardInput,
    ) -> Result<CreditCard, CoreError> {
        self.get(user, id).await?;
        self.put(user, id.to_string(), input).await
    }

    /// Delete a card. Transactions charged to it switch to cash in the same
    /// batch. Returns how many transactions were switched.
    pub async fn delete(&self, user: &UserId, id: &str) -> Result<usize, CoreError> {
        let cards = credit_cards_path(user);
        if self.store.get(&cards, id).await?.is_none() {
            return Err(CoreError::credit_card_not_found(id));
        }

        let transactions = transactions_path(user);
        let affected = self
            .store
            .query(&transactions, &Filter::eq("creditCardId", id))
            .await?;

        let mut ops: Vec<BatchOp> = affected
            .iter()
            .map(|doc| {
                BatchOp::update(
                    &transactions,
                    &doc.id,
                    json!({ "paymentMethod": PaymentMethod::Cash, "creditCardId": Value::Null }),
                )
            })
            .collect();
        ops.push(BatchOp::delete(&cards, id));

        self.store.batch_write(ops).await?;

        tracing::info!(user = %user, card = id, switched = affected.len(), "deleted credit card");
        Ok(affected.len())
    }

    async fn put(
        &self,
        user: &UserId,
        id: String,
        input: &CreditCardInput,
    ) -> Result<CreditCard, CoreError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(CoreError::ValidationError(
                "Credit card name must not be empty".into(),
            ));
        }
        for (label, day) in [("Closing day", input.closing_day), ("Due day", input.due_day)] {
            if !(1..=31).contains(&day) {
                return Err(CoreError::ValidationError(format!(
                    "{label} must be between 1 and 31, got {day}"
                )));
            }
        }
        if let Some(limit) = input.limit {
            if limit.is_sign_negative() {
                return Err(CoreError::ValidationError(format!(
                    "Credit limit must not be negative, got {limit}"
                )));
            }
        }

        let card = CreditCard {
            id,
            name: name.to_string(),
            limit: input.limit,
            closing_day: input.closing_day,
            due_day: input.due_day,
        };
        self.store
            .batch_write(vec![BatchOp::set(
                credit_cards_path(user),
                &card.id,
                Document::encode(&card)?,
            )])
            .await?;
        Ok(card)
    }
}
