//! Active-workspace selection.
//!
//! The selection lives in a signed, http-only cookie. Reading it performs no
//! validation; the workspace middleware re-checks membership on every request
//! before the id is trusted.

use axum_extra::extract::{
    SignedCookieJar,
    cookie::{Cookie, SameSite},
};
use thiserror::Error;
use time::Duration;
use tracing::{info, warn};

use jurnal_core::{UserId, WorkspaceId};
use jurnal_infra::cache::ViewCaches;
use jurnal_infra::store::{LedgerStore, StoreError};

use crate::cookies::{ACTIVE_WORKSPACE_COOKIE, invalidate_cookie};

pub const ACTIVE_WORKSPACE_MAX_AGE: Duration = Duration::days(7);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("you are not a member of this workspace")]
    NotAMember,

    #[error("{0}")]
    Persistence(#[from] StoreError),
}

/// The workspace id stored in the cookie, if any and if it parses.
pub fn active_workspace_id(jar: &SignedCookieJar) -> Option<WorkspaceId> {
    jar.get(ACTIVE_WORKSPACE_COOKIE)
        .and_then(|cookie| cookie.value_trimmed().parse().ok())
}

/// Make `workspace_id` the active workspace for `user_id`.
///
/// Membership is checked first; on failure the jar is left untouched. On
/// success the cached views of the previously active workspace are dropped.
pub async fn select_workspace<S: LedgerStore + ?Sized>(
    store: &S,
    caches: &ViewCaches,
    jar: SignedCookieJar,
    workspace_id: WorkspaceId,
    user_id: UserId,
    secure: bool,
) -> Result<SignedCookieJar, WorkspaceError> {
    if !store.is_member(user_id, workspace_id).await? {
        warn!(%user_id, %workspace_id, "workspace selection refused: not a member");
        return Err(WorkspaceError::NotAMember);
    }

    if let Some(previous) = active_workspace_id(&jar).filter(|previous| *previous != workspace_id) {
        caches.invalidate_workspace(previous);
    }

    info!(%user_id, %workspace_id, "active workspace selected");
    Ok(jar.add(
        Cookie::build((ACTIVE_WORKSPACE_COOKIE, workspace_id.to_string()))
            .path("/")
            .max_age(ACTIVE_WORKSPACE_MAX_AGE)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(secure),
    ))
}

/// Forget the active workspace (sign-out, or a stale selection).
pub fn clear_workspace(jar: SignedCookieJar, secure: bool) -> SignedCookieJar {
    invalidate_cookie(jar, ACTIVE_WORKSPACE_COOKIE, secure)
}
