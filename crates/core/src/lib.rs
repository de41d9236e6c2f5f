pub mod errors;
pub mod identity;
pub mod models;
pub mod services;
pub mod storage;
pub mod store;

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use errors::CoreError;
use identity::{IdentityProvider, UserId};
use models::{
    category::{Category, CategoryInput},
    credit_card::{CreditCard, CreditCardInput},
    request::{GroupEdit, TransactionEdit, TransactionRequest},
    settings::Settings,
    summary::MonthlySummary,
    transaction::{Transaction, TransactionFilter},
};
use services::{
    analytics_service::AnalyticsService, category_service::CategoryService,
    credit_card_service::CreditCardService, transaction_service::TransactionService,
};
use store::{
    categories_path, credit_cards_path, transactions_path, ChangeCallback, Document,
    DocumentStore, Filter, Subscription,
};

/// Main entry point for the Finance Tracker core library.
///
/// Collaborators are injected: the document store holding the user's
/// collections and the identity provider naming the signed-in user.
/// Every operation resolves the current user first and fails with
/// `CoreError::Unauthenticated` when there is none.
#[must_use]
pub struct FinanceTracker {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    settings: Settings,
    transaction_service: TransactionService,
    category_service: CategoryService,
    credit_card_service: CreditCardService,
    analytics_service: AnalyticsService,
}

impl std::fmt::Debug for FinanceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinanceTracker")
            .field("store", &self.store.name())
            .field("user", &self.identity.current_user())
            .field("settings", &self.settings)
            .finish()
    }
}

impl FinanceTracker {
    /// Wire up the tracker. Settings are validated here.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        settings: Settings,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        Ok(Self {
            transaction_service: TransactionService::new(Arc::clone(&store), &settings),
            category_service: CategoryService::new(Arc::clone(&store), &settings),
            credit_card_service: CreditCardService::new(Arc::clone(&store)),
            analytics_service: AnalyticsService::new(),
            store,
            identity,
            settings,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The signed-in user, or `Unauthenticated`.
    pub fn current_user(&self) -> Result<UserId, CoreError> {
        self.identity.current_user().ok_or(CoreError::Unauthenticated)
    }

    // ── Transactions ────────────────────────────────────────────────

    /// Record a single, installment or recurring transaction.
    /// All generated transactions are written in one batch.
    pub async fn add_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<Vec<Transaction>, CoreError> {
        let user = self.current_user()?;
        self.transaction_service.add(&user, request).await
    }

    pub async fn get_transaction(&self, id: &str) -> Result<Transaction, CoreError> {
        let user = self.current_user()?;
        self.transaction_service.get(&user, id).await
    }

    /// Transactions matching `filter`, oldest first.
    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, CoreError> {
        let user = self.current_user()?;
        self.transaction_service.list(&user, filter).await
    }

    /// Members of an installment or recurring group, oldest first.
    pub async fn group_members(&self, group_id: &str) -> Result<Vec<Transaction>, CoreError> {
        let user = self.current_user()?;
        self.transaction_service.group_members(&user, group_id).await
    }

    /// Edit one transaction only, even if it belongs to a group.
    pub async fn edit_transaction(
        &self,
        id: &str,
        edit: &TransactionEdit,
    ) -> Result<Transaction, CoreError> {
        let user = self.current_user()?;
        self.transaction_service.edit_single(&user, id, edit).await
    }

    /// Apply category/payment changes to every member of a group.
    /// Returns the number of transactions updated.
    pub async fn edit_group(&self, group_id: &str, edit: &GroupEdit) -> Result<usize, CoreError> {
        let user = self.current_user()?;
        self.transaction_service.edit_group(&user, group_id, edit).await
    }

    /// Delete one transaction; other group members are kept.
    pub async fn delete_transaction(&self, id: &str) -> Result<(), CoreError> {
        let user = self.current_user()?;
        self.transaction_service.delete_single(&user, id).await
    }

    /// Delete every member of a group. Returns how many were removed.
    pub async fn delete_group(&self, group_id: &str) -> Result<usize, CoreError> {
        let user = self.current_user()?;
        self.transaction_service.delete_group(&user, group_id).await
    }

    // ── Categories ──────────────────────────────────────────────────

    pub async fn add_category(&self, input: &CategoryInput) -> Result<Category, CoreError> {
        let user = self.current_user()?;
        self.category_service.add(&user, input).await
    }

    /// Create a category under a chosen id (used to seed defaults).
    pub async fn add_category_with_id(
        &self,
        id: &str,
        input: &CategoryInput,
    ) -> Result<Category, CoreError> {
        let user = self.current_user()?;
        self.category_service.add_with_id(&user, id, input).await
    }

    pub async fn update_category(
        &self,
        id: &str,
        input: &CategoryInput,
    ) -> Result<Category, CoreError> {
        let user = self.current_user()?;
        self.category_service.update(&user, id, input).await
    }

    /// Delete a category; its transactions move to the fallback category.
    /// Returns how many transactions were reassigned.
    pub async fn delete_category(&self, id: &str) -> Result<usize, CoreError> {
        let user = self.current_user()?;
        self.category_service.delete(&user, id).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, CoreError> {
        let user = self.current_user()?;
        self.category_service.list(&user).await
    }

    /// Make sure the fallback category exists.
    pub async fn ensure_fallback_category(&self) -> Result<Category, CoreError> {
        let user = self.current_user()?;
        self.category_service.ensure_fallback(&user).await
    }

    // ── Credit Cards ────────────────────────────────────────────────

    pub async fn add_credit_card(&self, input: &CreditCardInput) -> Result<CreditCard, CoreError> {
        let user = self.current_user()?;
        self.credit_card_service.add(&user, input).await
    }

    pub async fn update_credit_card(
        &self,
        id: &str,
        input: &CreditCardInput,
    ) -> Result<CreditCard, CoreError> {
        let user = self.current_user()?;
        self.credit_card_service.update(&user, id, input).await
    }

    /// Delete a card; its transactions switch to cash.
    /// Returns how many transactions were switched.
    pub async fn delete_credit_card(&self, id: &str) -> Result<usize, CoreError> {
        let user = self.current_user()?;
        self.credit_card_service.delete(&user, id).await
    }

    pub async fn list_credit_cards(&self) -> Result<Vec<CreditCard>, CoreError> {
        let user = self.current_user()?;
        self.credit_card_service.list(&user).await
    }

    // ── Dashboard ───────────────────────────────────────────────────

    /// Income, expenses and breakdowns for one calendar month.
    pub async fn monthly_summary(&self, year: i32, month: u32) -> Result<MonthlySummary, CoreError> {
        let user = self.current_user()?;
        let transactions = self
            .transaction_service
            .list(&user, &TransactionFilter::default())
            .await?;
        let categories = self.category_service.list(&user).await?;
        let cards = self.credit_card_service.list(&user).await?;
        self.analytics_service
            .monthly_summary(&transactions, &categories, &cards, year, month)
    }

    /// Running balance of all transactions dated on or before `date`.
    pub async fn balance_until(&self, date: NaiveDate) -> Result<Decimal, CoreError> {
        let user = self.current_user()?;
        let transactions = self
            .transaction_service
            .list(&user, &TransactionFilter {
                to: Some(date),
                ..TransactionFilter::default()
            })
            .await?;
        self.analytics_service.balance_until(&transactions, date)
    }

    // ── Live Views ──────────────────────────────────────────────────

    /// Receive the user's transactions now and after every change.
    /// Documents that fail to decode are skipped.
    pub fn subscribe_transactions(
        &self,
        on_change: impl Fn(Vec<Transaction>) + Send + Sync + 'static,
    ) -> Result<Subscription, CoreError> {
        let user = self.current_user()?;
        self.subscribe_decoded(&transactions_path(&user), move |mut txs: Vec<Transaction>| {
            services::sort_transactions(&mut txs);
            on_change(txs);
        })
    }

    /// Receive the user's categories now and after every change.
    pub fn subscribe_categories(
        &self,
        on_change: impl Fn(Vec<Category>) + Send + Sync + 'static,
    ) -> Result<Subscription, CoreError> {
        let user = self.current_user()?;
        self.subscribe_decoded(&categories_path(&user), on_change)
    }

    /// Receive the user's credit cards now and after every change.
    pub fn subscribe_credit_cards(
        &self,
        on_change: impl Fn(Vec<CreditCard>) + Send + Sync + 'static,
    ) -> Result<Subscription, CoreError> {
        let user = self.current_user()?;
        self.subscribe_decoded(&credit_cards_path(&user), on_change)
    }

    // ── Internal ────────────────────────────────────────────────────

    fn subscribe_decoded<T>(
        &self,
        collection: &str,
        on_change: impl Fn(Vec<T>) + Send + Sync + 'static,
    ) -> Result<Subscription, CoreError>
    where
        T: serde::de::DeserializeOwned + 'static,
    {
        let owned_collection = collection.to_string();
        let callback: ChangeCallback = Arc::new(move |docs: &[Document]| {
            let decoded = docs
                .iter()
                .filter_map(|doc| match doc.decode::<T>() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(collection = %owned_collection, id = %doc.id, "skipping undecodable document: {e}");
                        None
                    }
                })
                .collect();
            on_change(decoded);
        });
        self.store.subscribe(collection, Filter::All, callback)
    }
}
