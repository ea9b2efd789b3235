//! Auth provider adapters.
//!
//! Both adapters store bcrypt password hashes and hand out opaque random
//! session tokens; the session itself (user, issued-at, expires-at) stays on
//! the server.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryAuthProvider;
pub use postgres::PostgresAuthProvider;

use jurnal_auth::{AuthError, SessionToken};
use uuid::Uuid;

/// bcrypt's recommended work factor.
pub const DEFAULT_HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// Hash off the async runtime; bcrypt is deliberately slow.
pub(crate) async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Provider(format!("password hashing task failed: {e}")))?
        .map_err(|e| AuthError::Provider(format!("password hashing failed: {e}")))
}

pub(crate) async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Provider(format!("password check task failed: {e}")))?
        .map_err(|e| AuthError::Provider(format!("password check failed: {e}")))
}

pub(crate) fn new_session_token() -> SessionToken {
    SessionToken::new(Uuid::new_v4().simple().to_string())
}
