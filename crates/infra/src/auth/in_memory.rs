use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use jurnal_auth::{
    AuthError, AuthProvider, CurrentUser, SessionClaims, SessionToken, SignedIn, normalize_email,
    validate_session,
};
use jurnal_core::UserId;

use super::{DEFAULT_HASH_COST, hash_password, new_session_token, verify_password};

#[derive(Debug, Clone)]
struct StoredUser {
    id: UserId,
    email: String,
    password_hash: String,
}

/// In-memory auth provider for tests/dev.
#[derive(Debug)]
pub struct InMemoryAuthProvider {
    users: RwLock<HashMap<String, StoredUser>>,
    sessions: RwLock<HashMap<SessionToken, SessionClaims>>,
    session_ttl: Duration,
    hash_cost: u32,
}

impl InMemoryAuthProvider {
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            session_ttl,
            hash_cost: DEFAULT_HASH_COST,
        }
    }

    /// Lower the bcrypt cost (tests use bcrypt's minimum of 4).
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = normalize_email(email);
        let password_hash = hash_password(password, self.hash_cost).await?;

        let mut users = self
            .users
            .write()
            .map_err(|_| AuthError::Provider("user table lock poisoned".to_string()))?;
        if users.contains_key(&email) {
            return Err(AuthError::Provider(format!("{email} is already registered")));
        }

        let user = StoredUser {
            id: UserId::new(),
            email: email.clone(),
            password_hash,
        };
        let current = CurrentUser {
            id: user.id,
            email: user.email.clone(),
        };
        users.insert(email, user);
        Ok(current)
    }

    fn find_user(&self, email: &str) -> Result<Option<StoredUser>, AuthError> {
        let users = self
            .users
            .read()
            .map_err(|_| AuthError::Provider("user table lock poisoned".to_string()))?;
        Ok(users.get(email).cloned())
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn current_user(&self, token: &SessionToken) -> Result<CurrentUser, AuthError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| AuthError::Provider("session table lock poisoned".to_string()))?;
        let claims = sessions.get(token).cloned().ok_or(AuthError::NotAuthenticated)?;

        if let Err(err) = validate_session(&claims, Utc::now()) {
            if err == AuthError::Expired {
                sessions.remove(token);
            }
            return Err(err);
        }
        Ok(claims.user())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AuthError> {
        let email = normalize_email(email);
        let user = self.find_user(&email)?.ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let current = CurrentUser {
            id: user.id,
            email: user.email,
        };
        let claims = SessionClaims::issue(&current, Utc::now(), self.session_ttl);
        let token = new_session_token();
        let expires_at = claims.expires_at;

        self.sessions
            .write()
            .map_err(|_| AuthError::Provider("session table lock poisoned".to_string()))?
            .insert(token.clone(), claims);

        Ok(SignedIn {
            token,
            user: current,
            expires_at,
        })
    }

    async fn sign_out(&self, token: &SessionToken) -> Result<(), AuthError> {
        self.sessions
            .write()
            .map_err(|_| AuthError::Provider("session table lock poisoned".to_string()))?
            .remove(token);
        Ok(())
    }
}
