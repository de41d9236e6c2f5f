use serde::{Deserialize, Serialize};

use super::transaction::TransactionType;

/// A user-owned label transactions are filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,

    pub name: String,

    /// Restricts the category to income or expense forms; `None` = both
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,

    /// Display color, e.g. "#ff8800"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: None,
            color: None,
        }
    }
}

/// Input for creating or replacing a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<TransactionType>,
    #[serde(default)]
    pub color: Option<String>,
}

impl CategoryInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
