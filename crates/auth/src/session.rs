use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use jurnal_core::UserId;

use crate::error::AuthError;

/// The signed-in user as seen by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
}

/// Opaque session token handed out by an auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a provider remembers about a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId,
    pub email: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    pub fn issue(user: &CurrentUser, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: user.id,
            email: user.email.clone(),
            issued_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn user(&self) -> CurrentUser {
        CurrentUser {
            id: self.sub,
            email: self.email.clone(),
        }
    }
}

/// Deterministically validate a session's time window.
pub fn validate_session(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), AuthError> {
    if claims.expires_at <= claims.issued_at {
        return Err(AuthError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(AuthError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(AuthError::Expired);
    }
    Ok(())
}

/// Sign-in compares emails trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
