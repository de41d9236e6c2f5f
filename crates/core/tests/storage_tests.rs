// ═══════════════════════════════════════════════════════════════════
// Storage Tests — key derivation, AES-GCM, FNTR format, snapshots
// ═══════════════════════════════════════════════════════════════════

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;

use finance_tracker_core::errors::CoreError;
use finance_tracker_core::identity::{StaticIdentity, UserId};
use finance_tracker_core::models::category::CategoryInput;
use finance_tracker_core::models::settings::Settings;
use finance_tracker_core::models::transaction::{TransactionFilter, TransactionType};
use finance_tracker_core::models::request::TransactionRequest;
use finance_tracker_core::storage::encryption::{
    self, KdfParams, KEY_LEN, NONCE_LEN, SALT_LEN,
};
use finance_tracker_core::storage::format::{self, SnapshotHeader, CURRENT_VERSION, HEADER_SIZE, MAGIC};
use finance_tracker_core::storage::manager::StorageManager;
use finance_tracker_core::store::{BatchOp, DocumentStore, MemoryStore};
use finance_tracker_core::FinanceTracker;

const PASSWORD: &str = "correct horse battery staple";

fn header(ciphertext_len: u64) -> SnapshotHeader {
    SnapshotHeader {
        version: CURRENT_VERSION,
        kdf_params: KdfParams::fast(),
        salt: [7u8; SALT_LEN],
        nonce: [9u8; NONCE_LEN],
        ciphertext_len,
    }
}

async fn populated_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .batch_write(vec![
            BatchOp::set(
                "users/u1/categories",
                "food",
                json!({ "name": "Food" }),
            ),
            BatchOp::set(
                "users/u1/transactions",
                "t1",
                json!({
                    "description": "Lunch",
                    "amount": "-12.50",
                    "type": "expense",
                    "categoryId": "food",
                    "date": "2024-02-01"
                }),
            ),
        ])
        .await
        .unwrap();
    store
}

// ═══════════════════════════════════════════════════════════════════
//  KdfParams
// ═══════════════════════════════════════════════════════════════════

mod kdf_params {
    use super::*;

    #[test]
    fn default_values() {
        let p = KdfParams::default();
        assert_eq!(p.memory_cost, 65_536);
        assert_eq!(p.time_cost, 3);
        assert_eq!(p.parallelism, 4);
    }

    #[test]
    fn fast_values_are_cheaper() {
        let fast = KdfParams::fast();
        let default = KdfParams::default();
        assert!(fast.memory_cost < default.memory_cost);
        assert!(fast.time_cost <= default.time_cost);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Key derivation
// ═══════════════════════════════════════════════════════════════════

mod key_derivation {
    use super::*;

    #[test]
    fn deterministic_for_same_inputs() {
        let salt = [1u8; SALT_LEN];
        let a = encryption::derive_key(PASSWORD, &salt, &KdfParams::fast()).unwrap();
        let b = encryption::derive_key(PASSWORD, &salt, &KdfParams::fast()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), KEY_LEN);
    }

    #[test]
    fn salt_and_password_change_the_key() {
        let params = KdfParams::fast();
        let base = encryption::derive_key(PASSWORD, &[1u8; SALT_LEN], &params).unwrap();
        let other_salt = encryption::derive_key(PASSWORD, &[2u8; SALT_LEN], &params).unwrap();
        let other_pw = encryption::derive_key("hunter2", &[1u8; SALT_LEN], &params).unwrap();
        assert_ne!(base, other_salt);
        assert_ne!(base, other_pw);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let params = KdfParams {
            memory_cost: 1024,
            time_cost: 0,
            parallelism: 1,
        };
        let err = encryption::derive_key(PASSWORD, &[0u8; SALT_LEN], &params).unwrap_err();
        assert!(matches!(err, CoreError::Encryption(_)));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Encrypt / decrypt
// ═══════════════════════════════════════════════════════════════════

mod encrypt_decrypt {
    use super::*;

    const KEY: [u8; KEY_LEN] = [42u8; KEY_LEN];
    const NONCE: [u8; NONCE_LEN] = [3u8; NONCE_LEN];

    #[test]
    fn round_trip() {
        let ciphertext = encryption::encrypt(b"ledger", &KEY, &NONCE).unwrap();
        assert_ne!(&ciphertext[..], b"ledger");
        assert_eq!(ciphertext.len(), b"ledger".len() + 16);
        let plaintext = encryption::decrypt(&ciphertext, &KEY, &NONCE).unwrap();
        assert_eq!(plaintext, b"ledger");
    }

    #[test]
    fn wrong_key_is_decryption_error() {
        let ciphertext = encryption::encrypt(b"ledger", &KEY, &NONCE).unwrap();
        let err = encryption::decrypt(&ciphertext, &[0u8; KEY_LEN], &NONCE).unwrap_err();
        assert!(matches!(err, CoreError::Decryption));
    }

    #[test]
    fn tampered_ciphertext_is_decryption_error() {
        let mut ciphertext = encryption::encrypt(b"ledger", &KEY, &NONCE).unwrap();
        ciphertext[0] ^= 0xff;
        assert!(matches!(
            encryption::decrypt(&ciphertext, &KEY, &NONCE),
            Err(CoreError::Decryption)
        ));
    }

    #[test]
    fn random_bytes_differ() {
        let a: [u8; SALT_LEN] = encryption::random_bytes().unwrap();
        let b: [u8; SALT_LEN] = encryption::random_bytes().unwrap();
        assert_ne!(a, b);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  FNTR file format
// ═══════════════════════════════════════════════════════════════════

mod file_format {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let bytes = format::encode(&header(5), b"hello");
        assert_eq!(bytes.len(), HEADER_SIZE + 5);
        assert_eq!(&bytes[..4], MAGIC);

        let (decoded, ciphertext) = format::decode(&bytes).unwrap();
        assert_eq!(decoded, header(5));
        assert_eq!(ciphertext, b"hello");
    }

    #[test]
    fn version_is_little_endian_after_magic() {
        let bytes = format::encode(&header(0), &[]);
        assert_eq!(&bytes[4..6], &CURRENT_VERSION.to_le_bytes());
    }

    #[test]
    fn too_small_is_invalid() {
        let err = format::decode(&[0u8; HEADER_SIZE - 1]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFileFormat(_)));
    }

    #[test]
    fn wrong_magic_is_invalid() {
        let mut bytes = format::encode(&header(1), b"x");
        bytes[..4].copy_from_slice(b"ABCD");
        assert!(matches!(
            format::decode(&bytes),
            Err(CoreError::InvalidFileFormat(_))
        ));
    }

    #[test]
    fn unknown_versions_are_rejected() {
        for version in [0u16, CURRENT_VERSION + 1] {
            let bytes = format::encode(
                &SnapshotHeader {
                    version,
                    ..header(1)
                },
                b"x",
            );
            assert!(matches!(
                format::decode(&bytes),
                Err(CoreError::UnsupportedVersion(v)) if v == version
            ));
        }
    }

    #[test]
    fn unsafe_kdf_costs_are_rejected() {
        let costs = [
            KdfParams { memory_cost: 4, ..KdfParams::fast() },
            KdfParams { memory_cost: 2_000_000, ..KdfParams::fast() },
            KdfParams { time_cost: 21, ..KdfParams::fast() },
            KdfParams { parallelism: 0, ..KdfParams::fast() },
        ];
        for kdf_params in costs {
            let bytes = format::encode(
                &SnapshotHeader {
                    kdf_params,
                    ..header(1)
                },
                b"x",
            );
            assert!(
                matches!(format::decode(&bytes), Err(CoreError::InvalidFileFormat(_))),
                "{kdf_params:?} should be rejected"
            );
        }
    }

    #[test]
    fn truncated_ciphertext_is_invalid() {
        let mut bytes = format::encode(&header(10), &[0u8; 10]);
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            format::decode(&bytes),
            Err(CoreError::InvalidFileFormat(_))
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  StorageManager
// ═══════════════════════════════════════════════════════════════════

mod manager {
    use super::*;

    #[tokio::test]
    async fn snapshot_round_trip() {
        let store = populated_store().await;
        let snapshot = store.snapshot().unwrap();

        let bytes = StorageManager::save_with_params(&snapshot, PASSWORD, KdfParams::fast()).unwrap();
        assert_eq!(&bytes[..4], MAGIC);

        let restored = StorageManager::load_from_bytes(&bytes, PASSWORD).unwrap();
        assert_eq!(restored, snapshot);
        assert_eq!(restored.document_count(), 2);
    }

    #[tokio::test]
    async fn wrong_password_is_decryption_error() {
        let snapshot = populated_store().await.snapshot().unwrap();
        let bytes = StorageManager::save_with_params(&snapshot, PASSWORD, KdfParams::fast()).unwrap();
        let err = StorageManager::load_from_bytes(&bytes, "wrong").unwrap_err();
        assert!(matches!(err, CoreError::Decryption));
    }

    #[tokio::test]
    async fn each_save_uses_fresh_salt_and_nonce() {
        let snapshot = populated_store().await.snapshot().unwrap();
        let a = StorageManager::save_with_params(&snapshot, PASSWORD, KdfParams::fast()).unwrap();
        let b = StorageManager::save_with_params(&snapshot, PASSWORD, KdfParams::fast()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_is_rejected_before_decryption() {
        let err = StorageManager::load_from_bytes(b"definitely not a snapshot at all, sorry", PASSWORD)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidFileFormat(_)));
    }

    #[tokio::test]
    async fn file_round_trip_restores_a_working_tracker() {
        let store = Arc::new(MemoryStore::new());
        let tracker = FinanceTracker::new(
            store.clone(),
            Arc::new(StaticIdentity::new(UserId::new("u1").unwrap())),
            Settings::default(),
        )
        .unwrap();
        tracker
            .add_category_with_id("rent", &CategoryInput::named("Rent"))
            .await
            .unwrap();
        tracker
            .add_transaction(
                &TransactionRequest::new(
                    "Rent",
                    "900".parse::<Decimal>().unwrap(),
                    TransactionType::Expense,
                    "rent",
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                )
                .recurring_until(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
            )
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.fntr");
        let path = path.to_str().unwrap();
        StorageManager::save_to_file(&store, path, PASSWORD).unwrap();

        let restored = Arc::new(StorageManager::load_from_file(path, PASSWORD).unwrap());
        let reopened = FinanceTracker::new(
            restored,
            Arc::new(StaticIdentity::new(UserId::new("u1").unwrap())),
            Settings::default(),
        )
        .unwrap();

        let before = tracker
            .list_transactions(&TransactionFilter::default())
            .await
            .unwrap();
        let after = reopened
            .list_transactions(&TransactionFilter::default())
            .await
            .unwrap();
        assert_eq!(after.len(), 6);
        assert_eq!(after, before);
        assert_eq!(reopened.list_categories().await.unwrap().len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.fntr");
        let err = StorageManager::load_from_file(path.to_str().unwrap(), PASSWORD).unwrap_err();
        assert!(matches!(err, CoreError::FileIO(_)));
    }
}
