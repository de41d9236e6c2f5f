use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::request::{ExpansionMode, TransactionRequest};
use crate::models::settings::Settings;
use crate::models::transaction::{Payment, TransactionDraft, TransactionType};

/// Description suffix stamped on every member of a recurring group.
pub const RECURRING_SUFFIX: &str = "(Recorrente)";

/// Largest accepted amount: 1,000,000,000,000.00.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Expands a transaction request into the dated drafts it stands for.
///
/// Pure business logic: no I/O and no clock. The caller persists the
/// returned drafts in one atomic batch.
#[derive(Debug, Clone)]
pub struct GroupEngine {
    max_group_months: u32,
}

impl GroupEngine {
    pub fn new(max_group_months: u32) -> Self {
        Self { max_group_months }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.max_group_months)
    }

    /// Expand a request, generating a fresh group id for grouped modes.
    pub fn expand(&self, request: &TransactionRequest) -> Result<Vec<TransactionDraft>, CoreError> {
        self.expand_with_group_id(request, &Uuid::new_v4().to_string())
    }

    /// Expand a request using the given group id (ignored in single mode).
    ///
    /// Validation runs first; an invalid request never yields drafts.
    pub fn expand_with_group_id(
        &self,
        request: &TransactionRequest,
        group_id: &str,
    ) -> Result<Vec<TransactionDraft>, CoreError> {
        self.validate(request)?;

        let drafts = match request.mode {
            ExpansionMode::Single => vec![draft(
                request,
                request.description.trim().to_string(),
                request.kind.signed(request.total_amount),
                request.start_date,
                None,
            )],
            ExpansionMode::Installments { count } => installments(request, count, group_id)?,
            ExpansionMode::Recurring { end_date } => {
                self.recurring(request, end_date, group_id)?
            }
        };

        tracing::debug!(
            mode = ?request.mode,
            drafts = drafts.len(),
            "expanded transaction request"
        );
        Ok(drafts)
    }

    /// Validate a request before expansion.
    ///
    /// Rules:
    /// - description and category must be non-empty
    /// - total must be positive, at most `MAX_AMOUNT`, with at most two decimal places
    /// - installments and recurring are expense-only
    /// - installment count >= 1 and each installment at least one cent
    /// - recurring end date after the start date
    /// - neither may reach past `max_group_months`
    pub fn validate(&self, request: &TransactionRequest) -> Result<(), CoreError> {
        if request.description.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "Description must not be empty".into(),
            ));
        }
        if request.category_id.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "A category is required".into(),
            ));
        }
        validate_total(request.total_amount)?;
        if let Some(Payment::CreditCard(card)) = &request.payment {
            if card.trim().is_empty() {
                return Err(CoreError::ValidationError(
                    "Credit card payments require a credit card id".into(),
                ));
            }
        }

        match request.mode {
            ExpansionMode::Single => Ok(()),
            ExpansionMode::Installments { count } => {
                require_expense(request.kind, "Installments")?;
                if count == 0 {
                    return Err(CoreError::ValidationError(
                        "Installment count must be at least 1".into(),
                    ));
                }
                if count - 1 > self.max_group_months {
                    return Err(CoreError::InvalidRange(format!(
                        "{count} installments exceed the limit of {} months",
                        self.max_group_months
                    )));
                }
                if installment_base(request.total_amount, count)?.is_zero() {
                    return Err(CoreError::ValidationError(format!(
                        "{} cannot be split into {count} installments of at least one cent",
                        request.total_amount
                    )));
                }
                Ok(())
            }
            ExpansionMode::Recurring { end_date } => {
                require_expense(request.kind, "Recurring transactions")?;
                if end_date <= request.start_date {
                    return Err(CoreError::ValidationError(format!(
                        "End date {end_date} must be after start date {}",
                        request.start_date
                    )));
                }
                let horizon = add_months(request.start_date, self.max_group_months)?;
                if end_date > horizon {
                    return Err(CoreError::InvalidRange(format!(
                        "End date {end_date} is more than {} months after {}",
                        self.max_group_months, request.start_date
                    )));
                }
                Ok(())
            }
        }
    }

    fn recurring(
        &self,
        request: &TransactionRequest,
        end_date: NaiveDate,
        group_id: &str,
    ) -> Result<Vec<TransactionDraft>, CoreError> {
        let description = format!("{} {RECURRING_SUFFIX}", request.description.trim());
        let amount = TransactionType::Expense.signed(request.total_amount);

        let mut drafts = Vec::new();
        for k in 0..=self.max_group_months {
            let date = add_months(request.start_date, k)?;
            if date > end_date {
                break;
            }
            drafts.push(draft(
                request,
                description.clone(),
                amount,
                date,
                Some((group_id, k == 0)),
            ));
        }
        Ok(drafts)
    }
}

impl Default for GroupEngine {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Amount of every installment except the last: the total split evenly,
/// rounded down to the cent.
pub fn installment_base(total: Decimal, count: u32) -> Result<Decimal, CoreError> {
    total
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.checked_div(Decimal::from(count)))
        .and_then(|share| share.floor().checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| {
            CoreError::InvalidRange(format!("{total} cannot be split into {count} installments"))
        })
}

/// `date + months`, clamped to the last day of the target month.
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, CoreError> {
    date.checked_add_months(Months::new(months)).ok_or_else(|| {
        CoreError::InvalidRange(format!("{date} + {months} months is out of range"))
    })
}

fn installments(
    request: &TransactionRequest,
    count: u32,
    group_id: &str,
) -> Result<Vec<TransactionDraft>, CoreError> {
    let total = request.total_amount;
    let base = installment_base(total, count)?;
    let last = base
        .checked_mul(Decimal::from(count - 1))
        .and_then(|rest| total.checked_sub(rest))
        .ok_or_else(|| CoreError::InvalidRange(format!("{total} overflows installment split")))?;
    let description = request.description.trim();

    (0..count)
        .map(|k| {
            let magnitude = if k + 1 == count { last } else { base };
            Ok(draft(
                request,
                format!("{description} ({}/{count})", k + 1),
                TransactionType::Expense.signed(magnitude),
                add_months(request.start_date, k)?,
                Some((group_id, k == 0)),
            ))
        })
        .collect()
}

fn draft(
    request: &TransactionRequest,
    description: String,
    amount: Decimal,
    date: NaiveDate,
    group: Option<(&str, bool)>,
) -> TransactionDraft {
    TransactionDraft {
        description,
        amount,
        kind: request.kind,
        category_id: request.category_id.clone(),
        date,
        payment_method: request.payment.as_ref().map(Payment::method),
        credit_card_id: request
            .payment
            .as_ref()
            .and_then(Payment::credit_card_id)
            .map(str::to_string),
        group_id: group.map(|(id, _)| id.to_string()),
        is_original: group.map(|(_, original)| original),
    }
}

/// Totals must be positive, cent-denominated and at most `MAX_AMOUNT`.
pub(crate) fn validate_total(total: Decimal) -> Result<(), CoreError> {
    if total <= Decimal::ZERO {
        return Err(CoreError::ValidationError(format!(
            "Amount must be positive, got {total}"
        )));
    }
    if total > MAX_AMOUNT {
        return Err(CoreError::ValidationError(format!(
            "Amount {total} exceeds the maximum of {MAX_AMOUNT}"
        )));
    }
    if total.normalize().scale() > 2 {
        return Err(CoreError::ValidationError(format!(
            "Amount {total} has more than two decimal places"
        )));
    }
    Ok(())
}

fn require_expense(kind: TransactionType, what: &str) -> Result<(), CoreError> {
    if kind != TransactionType::Expense {
        return Err(CoreError::ValidationError(format!(
            "{what} are only supported for expenses"
        )));
    }
    Ok(())
}
