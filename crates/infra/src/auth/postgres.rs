use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use jurnal_auth::{
    AuthError, AuthProvider, CurrentUser, SessionClaims, SessionToken, SignedIn, normalize_email,
    validate_session,
};
use jurnal_core::UserId;

use super::{DEFAULT_HASH_COST, hash_password, new_session_token, verify_password};

/// Auth provider backed by the `users` and `sessions` tables.
#[derive(Debug, Clone)]
pub struct PostgresAuthProvider {
    pool: Arc<PgPool>,
    session_ttl: Duration,
    hash_cost: u32,
}

impl PostgresAuthProvider {
    pub fn new(pool: PgPool, session_ttl: Duration) -> Self {
        Self {
            pool: Arc::new(pool),
            session_ttl,
            hash_cost: DEFAULT_HASH_COST,
        }
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    #[instrument(skip(self, password), err)]
    pub async fn register(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let user = CurrentUser {
            id: UserId::new(),
            email: normalize_email(email),
        };
        let password_hash = hash_password(password, self.hash_cost).await?;

        sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3)")
            .bind(user.id.as_uuid())
            .bind(&user.email)
            .bind(password_hash)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("register", e))?;
        Ok(user)
    }
}

#[async_trait]
impl AuthProvider for PostgresAuthProvider {
    #[instrument(skip(self, token), err)]
    async fn current_user(&self, token: &SessionToken) -> Result<CurrentUser, AuthError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT user_id, email, issued_at, expires_at FROM sessions WHERE token = $1",
        )
        .bind(token.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("current_user", e))?;

        let claims = row.ok_or(AuthError::NotAuthenticated)?.into_claims();
        if let Err(err) = validate_session(&claims, Utc::now()) {
            if err == AuthError::Expired {
                self.sign_out(token).await?;
            }
            return Err(err);
        }
        Ok(claims.user())
    }

    #[instrument(skip(self, password), err)]
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AuthError> {
        let email = normalize_email(email);
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, email, password_hash FROM users WHERE email = $1")
                .bind(&email)
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("sign_in", e))?;
        let user = row.ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let current = CurrentUser {
            id: UserId::from_uuid(user.id),
            email: user.email,
        };
        let claims = SessionClaims::issue(&current, Utc::now(), self.session_ttl);
        let token = new_session_token();

        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, email, issued_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(token.as_str())
        .bind(current.id.as_uuid())
        .bind(&current.email)
        .bind(claims.issued_at)
        .bind(claims.expires_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("sign_in", e))?;

        Ok(SignedIn {
            token,
            user: current,
            expires_at: claims.expires_at,
        })
    }

    #[instrument(skip(self, token), err)]
    async fn sign_out(&self, token: &SessionToken) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("sign_out", e))?;
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> AuthError {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            AuthError::Provider(format!("{operation}: email is already registered"))
        }
        _ => AuthError::Provider(format!("sqlx error in {operation}: {err}")),
    }
}

#[derive(Debug)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
        })
    }
}

#[derive(Debug)]
struct SessionRow {
    user_id: Uuid,
    email: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for SessionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SessionRow {
            user_id: row.try_get("user_id")?,
            email: row.try_get("email")?,
            issued_at: row.try_get("issued_at")?,
            expires_at: row.try_get("expires_at")?,
        })
    }
}

impl SessionRow {
    fn into_claims(self) -> SessionClaims {
        SessionClaims {
            sub: UserId::from_uuid(self.user_id),
            email: self.email,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        }
    }
}
