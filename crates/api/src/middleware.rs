use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::SignedCookieJar;
use tracing::{debug, warn};

use crate::app::{AppState, errors};
use crate::context::{SessionContext, WorkspaceContext};
use crate::cookies::{self, ACTIVE_WORKSPACE_COOKIE};
use crate::workspace;

/// Where unauthenticated requests are sent.
pub const LOGIN_PATH: &str = "/login";

/// Resolve the `session` cookie to a user, or redirect to the login page.
pub async fn require_session(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = cookies::session_token(&jar) else {
        return Redirect::to(LOGIN_PATH).into_response();
    };

    let user = match state.services.current_user(&token).await {
        Ok(user) => user,
        Err(err) => {
            debug!(error = %err, "session rejected");
            return Redirect::to(LOGIN_PATH).into_response();
        }
    };

    req.extensions_mut().insert(SessionContext::new(user, token));
    next.run(req).await
}

/// Resolve the `active_workspace` cookie, re-checking membership on every
/// request. Must run inside [`require_session`].
pub async fn require_workspace(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(session) = req.extensions().get::<SessionContext>().cloned() else {
        return Redirect::to(LOGIN_PATH).into_response();
    };

    let workspace_id = match workspace::active_workspace_id(&jar) {
        Some(id) => id,
        None => {
            if jar.get(ACTIVE_WORKSPACE_COOKIE).is_some() {
                debug!("active workspace cookie does not hold a workspace id");
            }
            return errors::no_active_workspace();
        }
    };

    match state.services.is_member(session.user_id(), workspace_id).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(
                user_id = %session.user_id(),
                %workspace_id,
                "stale workspace selection cleared"
            );
            state.services.caches().invalidate_workspace(workspace_id);
            let jar = workspace::clear_workspace(jar, state.secure_cookies);
            return (jar, errors::not_a_member()).into_response();
        }
        Err(err) => return errors::store_error_to_response(err),
    }

    req.extensions_mut().insert(WorkspaceContext::new(workspace_id));
    next.run(req).await
}
