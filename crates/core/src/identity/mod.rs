use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Identifier of an authenticated user, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a provider-issued id. Rejects ids that would break a
    /// `users/{uid}/...` collection path.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.trim().is_empty() || id.contains('/') {
            return Err(CoreError::ValidationError(format!(
                "Invalid user id '{id}'"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of the current session's user.
///
/// The authentication protocol lives outside this crate; implementations
/// only report who is signed in.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
}

/// Always reports the same user. Handy for single-user embeddings and tests.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    user: UserId,
}

impl StaticIdentity {
    pub fn new(user: UserId) -> Self {
        Self { user }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        Some(self.user.clone())
    }
}

/// Session holder the presentation layer signs in and out of.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    user: RwLock<Option<UserId>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user: UserId) {
        if let Ok(mut current) = self.user.write() {
            tracing::info!(user = %user, "signed in");
            *current = Some(user);
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut current) = self.user.write() {
            *current = None;
        }
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.user.read().ok().and_then(|u| u.clone())
    }
}
