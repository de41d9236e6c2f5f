use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Direction of money flow for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionType {
    /// Money coming in, stored with a positive amount
    Income,
    /// Money going out, stored with a negative amount
    Expense,
}

impl TransactionType {
    /// Apply this type's sign to a (positive) magnitude.
    pub fn signed(&self, magnitude: Decimal) -> Decimal {
        let magnitude = magnitude.abs();
        match self {
            TransactionType::Income => magnitude,
            TransactionType::Expense => -magnitude,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Income => write!(f, "income"),
            TransactionType::Expense => write!(f, "expense"),
        }
    }
}

/// How a transaction was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::CreditCard => write!(f, "creditCard"),
        }
    }
}

/// Payment selection as submitted by a form.
///
/// Closed variant so a credit card id can only exist alongside
/// `PaymentMethod::CreditCard`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "creditCardId", rename_all = "camelCase")]
pub enum Payment {
    Cash,
    CreditCard(String),
}

impl Payment {
    pub fn method(&self) -> PaymentMethod {
        match self {
            Payment::Cash => PaymentMethod::Cash,
            Payment::CreditCard(_) => PaymentMethod::CreditCard,
        }
    }

    pub fn credit_card_id(&self) -> Option<&str> {
        match self {
            Payment::Cash => None,
            Payment::CreditCard(id) => Some(id.as_str()),
        }
    }
}

/// A stored income or expense record.
///
/// Serialized with camelCase field names; that shape is the document
/// layout in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Document id inside the user's transactions collection
    pub id: String,

    pub description: String,

    /// Signed amount: positive = income, negative = expense
    pub amount: Decimal,

    #[serde(rename = "type")]
    pub kind: TransactionType,

    pub category_id: String,

    /// Date of the transaction (daily granularity)
    pub date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,

    /// Present only when `payment_method` is `CreditCard`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_card_id: Option<String>,

    /// Shared by every member of an installment or recurring batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    /// `Some(true)` on the first member generated for a group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_original: Option<bool>,
}

impl Transaction {
    /// Attach a document id to a draft.
    pub fn from_draft(id: impl Into<String>, draft: TransactionDraft) -> Self {
        Self {
            id: id.into(),
            description: draft.description,
            amount: draft.amount,
            kind: draft.kind,
            category_id: draft.category_id,
            date: draft.date,
            payment_method: draft.payment_method,
            credit_card_id: draft.credit_card_id,
            group_id: draft.group_id,
            is_original: draft.is_original,
        }
    }

    /// Absolute value of the amount.
    pub fn magnitude(&self) -> Decimal {
        self.amount.abs()
    }

    pub fn is_group_member(&self) -> bool {
        self.group_id.is_some()
    }

    pub fn is_original_member(&self) -> bool {
        self.is_original == Some(true)
    }

    /// Check the record-level invariants:
    /// - amount sign matches type
    /// - credit card id present only with credit card payment
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_fields(
            self.amount,
            self.kind,
            self.payment_method,
            self.credit_card_id.as_deref(),
        )
    }
}

/// A transaction that has not been assigned a document id yet.
/// Produced by the group engine; persisted by the transaction service.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub description: String,
    pub amount: Decimal,
    pub kind: TransactionType,
    pub category_id: String,
    pub date: NaiveDate,
    pub payment_method: Option<PaymentMethod>,
    pub credit_card_id: Option<String>,
    pub group_id: Option<String>,
    pub is_original: Option<bool>,
}

impl TransactionDraft {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_fields(
            self.amount,
            self.kind,
            self.payment_method,
            self.credit_card_id.as_deref(),
        )
    }
}

fn validate_fields(
    amount: Decimal,
    kind: TransactionType,
    payment_method: Option<PaymentMethod>,
    credit_card_id: Option<&str>,
) -> Result<(), CoreError> {
    if amount.is_zero() {
        return Err(CoreError::ValidationError(
            "Transaction amount must not be zero".into(),
        ));
    }
    let sign_ok = match kind {
        TransactionType::Income => amount.is_sign_positive(),
        TransactionType::Expense => amount.is_sign_negative(),
    };
    if !sign_ok {
        return Err(CoreError::ValidationError(format!(
            "Amount {amount} does not match transaction type '{kind}'"
        )));
    }
    match (payment_method, credit_card_id) {
        (Some(PaymentMethod::CreditCard), None) => Err(CoreError::ValidationError(
            "Credit card payments require a credit card id".into(),
        )),
        (Some(PaymentMethod::CreditCard), Some(_)) => Ok(()),
        (_, Some(card)) => Err(CoreError::ValidationError(format!(
            "Credit card '{card}' set on a transaction not paid by credit card"
        ))),
        (_, None) => Ok(()),
    }
}

/// Filter for transaction listings. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub kind: Option<TransactionType>,
    pub category_id: Option<String>,
    pub credit_card_id: Option<String>,
    pub group_id: Option<String>,
    /// Inclusive lower bound
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound
    pub to: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.kind.map_or(true, |k| tx.kind == k)
            && self
                .category_id
                .as_deref()
                .map_or(true, |c| tx.category_id == c)
            && self
                .credit_card_id
                .as_deref()
                .map_or(true, |c| tx.credit_card_id.as_deref() == Some(c))
            && self
                .group_id
                .as_deref()
                .map_or(true, |g| tx.group_id.as_deref() == Some(g))
            && self.from.map_or(true, |from| tx.date >= from)
            && self.to.map_or(true, |to| tx.date <= to)
    }
}
