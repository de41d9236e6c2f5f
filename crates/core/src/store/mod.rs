pub mod memory;
pub mod query;
pub mod traits;

pub use memory::{MemoryStore, StoreSnapshot};
pub use query::{BatchOp, Document, Filter};
pub use traits::{ChangeCallback, DocumentStore, Subscription};

use crate::identity::UserId;

/// Collection path of a user's transactions.
pub fn transactions_path(user: &UserId) -> String {
    format!("users/{user}/transactions")
}

/// Collection path of a user's categories.
pub fn categories_path(user: &UserId) -> String {
    format!("users/{user}/categories")
}

/// Collection path of a user's credit cards.
pub fn credit_cards_path(user: &UserId) -> String {
    format!("users/{user}/creditCards")
}
