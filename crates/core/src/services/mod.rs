pub mod analytics_service;
pub mod category_service;
pub mod credit_card_service;
pub mod group_engine;
pub mod transaction_service;

use crate::errors::CoreError;
use crate::identity::UserId;
use crate::models::transaction::Transaction;
use crate::store::{categories_path, credit_cards_path, transactions_path, DocumentStore, Filter};

/// Fail with `ValidationError` unless the category document exists.
pub(crate) async fn require_category(
    store: &dyn DocumentStore,
    user: &UserId,
    category_id: &str,
) -> Result<(), CoreError> {
    match store.get(&categories_path(user), category_id).await? {
        Some(_) => Ok(()),
        None => Err(CoreError::ValidationError(format!(
            "Category '{category_id}' does not exist"
        ))),
    }
}

/// Fail with `ValidationError` unless the credit card document exists.
pub(crate) async fn require_credit_card(
    store: &dyn DocumentStore,
    user: &UserId,
    card_id: &str,
) -> Result<(), CoreError> {
    match store.get(&credit_cards_path(user), card_id).await? {
        Some(_) => Ok(()),
        None => Err(CoreError::ValidationError(format!(
            "Credit card '{card_id}' does not exist"
        ))),
    }
}

/// Query and decode transactions.
pub(crate) async fn query_transactions(
    store: &dyn DocumentStore,
    user: &UserId,
    filter: &Filter,
) -> Result<Vec<Transaction>, CoreError> {
    store
        .query(&transactions_path(user), filter)
        .await?
        .iter()
        .map(|doc| doc.decode::<Transaction>())
        .collect()
}

/// Order used for every transaction listing: by date, then description.
pub(crate) fn sort_transactions(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.description.cmp(&b.description))
            .then_with(|| a.id.cmp(&b.id))
    });
}
