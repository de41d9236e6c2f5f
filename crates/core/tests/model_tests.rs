use chrono::NaiveDate;
use finance_tracker_core::errors::CoreError;
use finance_tracker_core::identity::{IdentityProvider, SessionIdentity, StaticIdentity, UserId};
use finance_tracker_core::models::category::{Category, CategoryInput};
use finance_tracker_core::models::credit_card::{CreditCard, CreditCardInput};
use finance_tracker_core::models::request::{ExpansionMode, GroupEdit, TransactionRequest};
use finance_tracker_core::models::settings::{OriginalDeletionPolicy, Settings};
use finance_tracker_core::models::transaction::{
    Payment, PaymentMethod, Transaction, TransactionFilter, TransactionType,
};
use rust_decimal::Decimal;
use serde_json::json;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn card_expense() -> Transaction {
    Transaction {
        id: "t1".into(),
        description: "Laptop (1/3)".into(),
        amount: dec("-33.33"),
        kind: TransactionType::Expense,
        category_id: "tech".into(),
        date: d(2024, 1, 15),
        payment_method: Some(PaymentMethod::CreditCard),
        credit_card_id: Some("visa".into()),
        group_id: Some("g1".into()),
        is_original: Some(true),
    }
}

// ═══════════════════════════════════════════════════════════════════
//  TransactionType / PaymentMethod
// ═══════════════════════════════════════════════════════════════════

mod transaction_type {
    use super::*;

    #[test]
    fn signed_applies_direction() {
        assert_eq!(TransactionType::Income.signed(dec("12.5")), dec("12.5"));
        assert_eq!(TransactionType::Expense.signed(dec("12.5")), dec("-12.5"));
        assert_eq!(TransactionType::Income.signed(dec("-3")), dec("3"));
    }

    #[test]
    fn display() {
        assert_eq!(TransactionType::Income.to_string(), "income");
        assert_eq!(TransactionType::Expense.to_string(), "expense");
        assert_eq!(PaymentMethod::Cash.to_string(), "cash");
        assert_eq!(PaymentMethod::CreditCard.to_string(), "creditCard");
    }

    #[test]
    fn serde_names() {
        assert_eq!(json!(TransactionType::Expense), json!("expense"));
        assert_eq!(json!(PaymentMethod::CreditCard), json!("creditCard"));
        let back: PaymentMethod = serde_json::from_value(json!("cash")).unwrap();
        assert_eq!(back, PaymentMethod::Cash);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Payment
// ═══════════════════════════════════════════════════════════════════

mod payment {
    use super::*;

    #[test]
    fn card_id_only_on_credit_card() {
        assert_eq!(Payment::Cash.credit_card_id(), None);
        assert_eq!(Payment::Cash.method(), PaymentMethod::Cash);
        let card = Payment::CreditCard("visa".into());
        assert_eq!(card.credit_card_id(), Some("visa"));
        assert_eq!(card.method(), PaymentMethod::CreditCard);
    }

    #[test]
    fn serde_shape() {
        assert_eq!(json!(Payment::Cash), json!({ "method": "cash" }));
        assert_eq!(
            json!(Payment::CreditCard("visa".into())),
            json!({ "method": "creditCard", "creditCardId": "visa" })
        );
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Transaction
// ═══════════════════════════════════════════════════════════════════

mod transaction {
    use super::*;

    #[test]
    fn valid_card_expense() {
        assert!(card_expense().validate().is_ok());
        assert!(card_expense().is_group_member());
        assert!(card_expense().is_original_member());
        assert_eq!(card_expense().magnitude(), dec("33.33"));
    }

    #[test]
    fn zero_amount_is_invalid() {
        let mut tx = card_expense();
        tx.amount = Decimal::ZERO;
        assert!(matches!(tx.validate(), Err(CoreError::ValidationError(_))));
    }

    #[test]
    fn sign_must_match_type() {
        let mut tx = card_expense();
        tx.amount = dec("33.33");
        assert!(tx.validate().is_err());
        tx.kind = TransactionType::Income;
        tx.payment_method = None;
        tx.credit_card_id = None;
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn card_requires_credit_card_method() {
        let mut tx = card_expense();
        tx.payment_method = Some(PaymentMethod::Cash);
        assert!(tx.validate().is_err());
        tx.payment_method = None;
        assert!(tx.validate().is_err());
    }

    #[test]
    fn credit_card_method_requires_card() {
        let mut tx = card_expense();
        tx.credit_card_id = None;
        assert!(tx.validate().is_err());
    }

    #[test]
    fn document_shape_is_camel_case() {
        let value = serde_json::to_value(card_expense()).unwrap();
        assert_eq!(value["type"], json!("expense"));
        assert_eq!(value["categoryId"], json!("tech"));
        assert_eq!(value["paymentMethod"], json!("creditCard"));
        assert_eq!(value["creditCardId"], json!("visa"));
        assert_eq!(value["groupId"], json!("g1"));
        assert_eq!(value["isOriginal"], json!(true));
        assert_eq!(value["date"], json!("2024-01-15"));
    }

    #[test]
    fn absent_optionals_are_omitted() {
        let tx = Transaction {
            payment_method: None,
            credit_card_id: None,
            group_id: None,
            is_original: None,
            ..card_expense()
        };
        let value = serde_json::to_value(&tx).unwrap();
        let obj = value.as_object().unwrap();
        for key in ["paymentMethod", "creditCardId", "groupId", "isOriginal"] {
            assert!(!obj.contains_key(key), "{key} should be omitted");
        }
    }

    #[test]
    fn legacy_document_without_optionals_decodes() {
        let tx: Transaction = serde_json::from_value(json!({
            "id": "old",
            "description": "Coffee",
            "amount": "-4.50",
            "type": "expense",
            "categoryId": "food",
            "date": "2023-05-02"
        }))
        .unwrap();
        assert_eq!(tx.amount, dec("-4.5"));
        assert!(tx.payment_method.is_none());
        assert!(!tx.is_group_member());
        assert!(!tx.is_original_member());
    }
}

// ═══════════════════════════════════════════════════════════════════
//  TransactionFilter
// ═══════════════════════════════════════════════════════════════════

mod filter {
    use super::*;

    #[test]
    fn default_matches_everything() {
        assert!(TransactionFilter::default().matches(&card_expense()));
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let on_day = TransactionFilter {
            from: Some(d(2024, 1, 15)),
            to: Some(d(2024, 1, 15)),
            ..TransactionFilter::default()
        };
        assert!(on_day.matches(&card_expense()));

        let after = TransactionFilter {
            from: Some(d(2024, 1, 16)),
            ..TransactionFilter::default()
        };
        assert!(!after.matches(&card_expense()));
    }

    #[test]
    fn all_fields_must_match() {
        let filter = TransactionFilter {
            kind: Some(TransactionType::Expense),
            credit_card_id: Some("visa".into()),
            group_id: Some("g1".into()),
            ..TransactionFilter::default()
        };
        assert!(filter.matches(&card_expense()));

        let other_card = TransactionFilter {
            credit_card_id: Some("amex".into()),
            ..filter.clone()
        };
        assert!(!other_card.matches(&card_expense()));

        let income = TransactionFilter {
            kind: Some(TransactionType::Income),
            ..filter
        };
        assert!(!income.matches(&card_expense()));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Requests
// ═══════════════════════════════════════════════════════════════════

mod request {
    use super::*;

    #[test]
    fn builders_set_mode_and_payment() {
        let req = TransactionRequest::new(
            "TV",
            dec("1200"),
            TransactionType::Expense,
            "tech",
            d(2024, 3, 1),
        );
        assert_eq!(req.mode, ExpansionMode::Single);
        assert!(req.payment.is_none());

        let req = req
            .with_payment(Payment::CreditCard("visa".into()))
            .installments(10);
        assert_eq!(req.mode, ExpansionMode::Installments { count: 10 });
        assert_eq!(req.payment, Some(Payment::CreditCard("visa".into())));

        let req = req.recurring_until(d(2024, 12, 1));
        assert_eq!(
            req.mode,
            ExpansionMode::Recurring {
                end_date: d(2024, 12, 1)
            }
        );
    }

    #[test]
    fn group_edit_emptiness() {
        assert!(GroupEdit::default().is_empty());
        let edit = GroupEdit {
            payment: Some(Payment::Cash),
            ..GroupEdit::default()
        };
        assert!(!edit.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Categories & credit cards
// ═══════════════════════════════════════════════════════════════════

mod owned_records {
    use super::*;

    #[test]
    fn category_serde_uses_type_key() {
        let cat = Category {
            kind: Some(TransactionType::Income),
            ..Category::new("salary", "Salary")
        };
        let value = serde_json::to_value(&cat).unwrap();
        assert_eq!(value["type"], json!("income"));
        assert!(value.get("color").is_none());
    }

    #[test]
    fn category_input_named() {
        let input = CategoryInput::named("Food");
        assert_eq!(input.name, "Food");
        assert!(input.kind.is_none());
        assert!(input.color.is_none());
    }

    #[test]
    fn credit_card_serde() {
        let card: CreditCard = serde_json::from_value(json!({
            "id": "visa",
            "name": "Visa",
            "closingDay": 5,
            "dueDay": 12
        }))
        .unwrap();
        assert_eq!(card.closing_day, 5);
        assert!(card.limit.is_none());

        let input = CreditCardInput::new("Visa", 5, 12).with_limit(dec("1500"));
        assert_eq!(input.limit, Some(dec("1500")));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Settings
// ═══════════════════════════════════════════════════════════════════

mod settings {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.max_group_months, 600);
        assert_eq!(s.original_deletion_policy, OriginalDeletionPolicy::Allow);
        assert_eq!(s.fallback_category_id, "other");
        assert_eq!(s.fallback_category_name, "Other");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn from_json_fills_missing_fields() {
        let s = Settings::from_json(r#"{ "originalDeletionPolicy": "promote" }"#).unwrap();
        assert_eq!(s.original_deletion_policy, OriginalDeletionPolicy::Promote);
        assert_eq!(s.max_group_months, 600);
    }

    #[test]
    fn from_json_rejects_invalid_values() {
        assert!(matches!(
            Settings::from_json(r#"{ "maxGroupMonths": 0 }"#),
            Err(CoreError::ValidationError(_))
        ));
        assert!(Settings::from_json(r#"{ "fallbackCategoryId": " " }"#).is_err());
        assert!(matches!(
            Settings::from_json("not json"),
            Err(CoreError::Deserialization(_))
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Identity
// ═══════════════════════════════════════════════════════════════════

mod identity {
    use super::*;

    #[test]
    fn user_id_display() {
        let id = UserId::new("abc123").unwrap();
        assert_eq!(id.to_string(), "abc123");
        assert_eq!(json!(id), json!("abc123"));
    }

    #[test]
    fn static_identity_always_reports_user() {
        let identity = StaticIdentity::new(UserId::new("u1").unwrap());
        assert_eq!(identity.current_user().unwrap().as_str(), "u1");
    }

    #[test]
    fn session_identity_tracks_sign_in() {
        let session = SessionIdentity::new();
        assert!(session.current_user().is_none());
        session.sign_in(UserId::new("u2").unwrap());
        assert_eq!(session.current_user().unwrap().as_str(), "u2");
        session.sign_out();
        assert!(session.current_user().is_none());
    }
}
