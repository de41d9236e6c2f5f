use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A credit card expenses can be charged to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCard {
    pub id: String,

    pub name: String,

    /// Credit limit, if the user tracks it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Decimal>,

    /// Day of month the statement closes (1..=31)
    pub closing_day: u8,

    /// Day of month the bill is due (1..=31)
    pub due_day: u8,
}

/// Input for creating or replacing a credit card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardInput {
    pub name: String,
    #[serde(default)]
    pub limit: Option<Decimal>,
    pub closing_day: u8,
    pub due_day: u8,
}

impl CreditCardInput {
    pub fn new(name: impl Into<String>, closing_day: u8, due_day: u8) -> Self {
        Self {
            name: name.into(),
            limit: None,
            closing_day,
            due_day,
        }
    }

    pub fn with_limit(mut self, limit: Decimal) -> Self {
        self.limit = Some(limit);
        self
    }
}
