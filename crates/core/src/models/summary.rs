use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Dashboard numbers for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub year: i32,

    /// 1..=12
    pub month: u32,

    /// Sum of income amounts
    pub total_income: Decimal,

    /// Sum of expense magnitudes (positive)
    pub total_expense: Decimal,

    /// total_income - total_expense
    pub balance: Decimal,

    pub transaction_count: usize,

    /// Expense totals per category, largest first
    pub by_category: Vec<CategoryTotal>,

    /// Expense totals per credit card, largest first
    pub by_credit_card: Vec<CreditCardTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category_id: String,
    /// `None` if the category document could not be found
    pub category_name: Option<String>,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardTotal {
    pub credit_card_id: String,
    pub name: Option<String>,
    pub total: Decimal,
}
