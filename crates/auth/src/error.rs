use thiserror::Error;

/// Authentication failures. Any of these on a protected route sends the
/// caller back to sign-in.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("session has expired")]
    Expired,

    #[error("session not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid session time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("not signed in")]
    NotAuthenticated,

    #[error("auth provider error: {0}")]
    Provider(String),
}
