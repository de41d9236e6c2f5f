use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::errors::CoreError;
use crate::models::category::Category;
use crate::models::credit_card::CreditCard;
use crate::models::summary::{CategoryTotal, CreditCardTotal, MonthlySummary};
use crate::models::transaction::{Transaction, TransactionType};

/// Computes dashboard numbers from a user's transactions.
///
/// Pure aggregation over data the caller has already loaded.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    /// Summarize one calendar month.
    ///
    /// Computes:
    /// - income and expense totals, and their balance
    /// - expense totals per category and per credit card, largest first
    pub fn monthly_summary(
        &self,
        transactions: &[Transaction],
        categories: &[Category],
        cards: &[CreditCard],
        year: i32,
        month: u32,
    ) -> Result<MonthlySummary, CoreError> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(CoreError::ValidationError(format!(
                "Invalid month {year}-{month:02}"
            )));
        }

        let in_month: Vec<&Transaction> = transactions
            .iter()
            .filter(|t| t.date.year() == year && t.date.month() == month)
            .collect();

        let mut total_income = Decimal::ZERO;
        let mut total_expense = Decimal::ZERO;
        let mut per_category: HashMap<&str, Decimal> = HashMap::new();
        let mut per_card: HashMap<&str, Decimal> = HashMap::new();

        for tx in &in_month {
            match tx.kind {
                TransactionType::Income => accumulate(&mut total_income, tx.magnitude())?,
                TransactionType::Expense => {
                    accumulate(&mut total_expense, tx.magnitude())?;
                    accumulate(
                        per_category.entry(tx.category_id.as_str()).or_default(),
                        tx.magnitude(),
                    )?;
                    if let Some(card) = tx.credit_card_id.as_deref() {
                        accumulate(per_card.entry(card).or_default(), tx.magnitude())?;
                    }
                }
            }
        }

        let mut by_category: Vec<CategoryTotal> = per_category
            .into_iter()
            .map(|(id, total)| CategoryTotal {
                category_id: id.to_string(),
                category_name: categories.iter().find(|c| c.id == id).map(|c| c.name.clone()),
                total,
            })
            .collect();
        by_category.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then_with(|| a.category_id.cmp(&b.category_id))
        });

        let mut by_credit_card: Vec<CreditCardTotal> = per_card
            .into_iter()
            .map(|(id, total)| CreditCardTotal {
                credit_card_id: id.to_string(),
                name: cards.iter().find(|c| c.id == id).map(|c| c.name.clone()),
                total,
            })
            .collect();
        by_credit_card.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then_with(|| a.credit_card_id.cmp(&b.credit_card_id))
        });

        Ok(MonthlySummary {
            year,
            month,
            total_income,
            total_expense,
            balance: total_income
                .checked_sub(total_expense)
                .ok_or_else(overflow)?,
            transaction_count: in_month.len(),
            by_category,
            by_credit_card,
        })
    }

    /// Signed sum of every transaction dated on or before `date`.
    pub fn balance_until(
        &self,
        transactions: &[Transaction],
        date: NaiveDate,
    ) -> Result<Decimal, CoreError> {
        let mut balance = Decimal::ZERO;
        for tx in transactions.iter().filter(|t| t.date <= date) {
            accumulate(&mut balance, tx.amount)?;
        }
        Ok(balance)
    }
}

fn accumulate(total: &mut Decimal, amount: Decimal) -> Result<(), CoreError> {
    *total = total.checked_add(amount).ok_or_else(overflow)?;
    Ok(())
}

fn overflow() -> CoreError {
    CoreError::InvalidRange("Totals exceed the representable amount range".into())
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}
