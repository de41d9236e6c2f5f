use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transaction::{Payment, TransactionType};

/// How a submission is materialized into transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ExpansionMode {
    /// One transaction on the start date
    Single,
    /// `count` monthly parts of the total, remainder on the last part
    Installments { count: u32 },
    /// The full amount every month until `end_date` (inclusive)
    #[serde(rename_all = "camelCase")]
    Recurring { end_date: NaiveDate },
}

/// A validated transaction-creation request, as submitted by a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub description: String,

    /// Positive total, at most two decimal places
    pub total_amount: Decimal,

    #[serde(rename = "type")]
    pub kind: TransactionType,

    pub category_id: String,

    pub start_date: NaiveDate,

    #[serde(default)]
    pub payment: Option<Payment>,

    pub mode: ExpansionMode,
}

impl TransactionRequest {
    pub fn new(
        description: impl Into<String>,
        total_amount: Decimal,
        kind: TransactionType,
        category_id: impl Into<String>,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            description: description.into(),
            total_amount,
            kind,
            category_id: category_id.into(),
            start_date,
            payment: None,
            mode: ExpansionMode::Single,
        }
    }

    pub fn with_payment(mut self, payment: Payment) -> Self {
        self.payment = Some(payment);
        self
    }

    pub fn installments(mut self, count: u32) -> Self {
        self.mode = ExpansionMode::Installments { count };
        self
    }

    pub fn recurring_until(mut self, end_date: NaiveDate) -> Self {
        self.mode = ExpansionMode::Recurring { end_date };
        self
    }
}

/// Field changes for a single transaction. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEdit {
    pub description: Option<String>,
    /// Magnitude; the sign is derived from the (new or current) type
    pub amount: Option<Decimal>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub category_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub payment: Option<Payment>,
}

/// Field changes propagated to every member of a group.
///
/// Description, amount and date are per-member and deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEdit {
    pub category_id: Option<String>,
    pub payment: Option<Payment>,
}

impl GroupEdit {
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none() && self.payment.is_none()
    }
}
