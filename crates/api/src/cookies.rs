//! Signed cookies: the session token and the active workspace.

use axum_extra::extract::{
    SignedCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha512};
use time::{Duration, OffsetDateTime};

use jurnal_auth::SessionToken;

pub const SESSION_COOKIE: &str = "session";
pub const ACTIVE_WORKSPACE_COOKIE: &str = "active_workspace";

/// Stretch a secret into the 64-byte key used to sign cookies.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}

/// Store the session token until the session expires.
pub fn set_session_cookie(
    jar: SignedCookieJar,
    token: &SessionToken,
    expires_at: DateTime<Utc>,
    secure: bool,
) -> SignedCookieJar {
    let seconds = (expires_at - Utc::now()).num_seconds().max(0);

    jar.add(
        Cookie::build((SESSION_COOKIE, token.as_str().to_string()))
            .path("/")
            .max_age(Duration::seconds(seconds))
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(secure),
    )
}

pub fn session_token(jar: &SignedCookieJar) -> Option<SessionToken> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_string())
        .filter(|value| !value.is_empty())
        .map(SessionToken::new)
}

/// Overwrite a cookie with an expired placeholder so the client drops it.
pub fn invalidate_cookie(jar: SignedCookieJar, name: &'static str, secure: bool) -> SignedCookieJar {
    jar.add(
        Cookie::build((name, "deleted"))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(secure),
    )
}
