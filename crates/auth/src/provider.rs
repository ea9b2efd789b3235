use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::session::{CurrentUser, SessionToken};

/// Result of a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedIn {
    pub token: SessionToken,
    pub user: CurrentUser,
    pub expires_at: DateTime<Utc>,
}

/// External identity service.
///
/// Implementations own credential checks and session storage; callers only
/// ever hold the opaque token.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve a session token to its user.
    async fn current_user(&self, token: &SessionToken) -> Result<CurrentUser, AuthError>;

    /// Check credentials and open a session. Implementations compare emails
    /// after [`crate::normalize_email`].
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AuthError>;

    /// Revoke a session. Revoking an unknown token is not an error.
    async fn sign_out(&self, token: &SessionToken) -> Result<(), AuthError>;
}

#[async_trait]
impl<P> AuthProvider for Arc<P>
where
    P: AuthProvider + ?Sized,
{
    async fn current_user(&self, token: &SessionToken) -> Result<CurrentUser, AuthError> {
        (**self).current_user(token).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AuthError> {
        (**self).sign_in(email, password).await
    }

    async fn sign_out(&self, token: &SessionToken) -> Result<(), AuthError> {
        (**self).sign_out(token).await
    }
}
