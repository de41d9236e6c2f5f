use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// What happens when the original member of a group is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OriginalDeletionPolicy {
    /// Delete it; the group may be left without an original member
    #[default]
    Allow,
    /// Delete it and mark the earliest remaining member as original
    Promote,
    /// Refuse the deletion
    Forbid,
}

/// Engine configuration, injected into `FinanceTracker::new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Upper bound on how many months past the start date a group may span.
    /// A recurring end date beyond it, or an installment count above it + 1,
    /// is rejected as an invalid range.
    pub max_group_months: u32,

    pub original_deletion_policy: OriginalDeletionPolicy,

    /// Category that receives the transactions of a deleted category
    pub fallback_category_id: String,

    /// Name used when the fallback category has to be created
    pub fallback_category_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_group_months: 600,
            original_deletion_policy: OriginalDeletionPolicy::Allow,
            fallback_category_id: "other".to_string(),
            fallback_category_name: "Other".to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_group_months == 0 {
            return Err(CoreError::ValidationError(
                "maxGroupMonths must be at least 1".into(),
            ));
        }
        if self.fallback_category_id.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "fallbackCategoryId must not be empty".into(),
            ));
        }
        if self.fallback_category_name.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "fallbackCategoryName must not be empty".into(),
            ));
        }
        Ok(())
    }
}
