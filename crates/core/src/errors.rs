use thiserror::Error;

/// Unified error type for the entire finance-tracker-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    // ── Identity ────────────────────────────────────────────────────
    #[error("No signed-in user")]
    Unauthenticated,

    // ── Document Store ──────────────────────────────────────────────
    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── Snapshot File ───────────────────────────────────────────────
    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Unsupported file version: {0}")]
    UnsupportedVersion(u16),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed — wrong password or corrupted file")]
    Decryption,

    // ── File I/O (native only) ──────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),
}

impl CoreError {
    pub(crate) fn transaction_not_found(id: &str) -> Self {
        CoreError::NotFound {
            kind: "Transaction",
            id: id.to_string(),
        }
    }

    pub(crate) fn category_not_found(id: &str) -> Self {
        CoreError::NotFound {
            kind: "Category",
            id: id.to_string(),
        }
    }

    pub(crate) fn credit_card_not_found(id: &str) -> Self {
        CoreError::NotFound {
            kind: "Credit card",
            id: id.to_string(),
        }
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<aes_gcm::Error> for CoreError {
    fn from(_: aes_gcm::Error) -> Self {
        CoreError::Decryption
    }
}
