use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::SignedCookieJar;
use tracing::{info, warn};

use crate::app::services::AppServices;
use crate::app::{AppState, dto, errors};
use crate::context::SessionContext;
use crate::cookies::{self, SESSION_COOKIE};
use crate::workspace;

/// Check credentials and set the session cookie. A user with exactly one
/// workspace gets it selected straight away.
pub async fn sign_in(
    State(state): State<AppState>,
    Extension(services): Extension<Arc<AppServices>>,
    jar: SignedCookieJar,
    Json(body): Json<dto::SignInRequest>,
) -> axum::response::Response {
    let signed_in = match services.auth().sign_in(&body.email, &body.password).await {
        Ok(signed_in) => signed_in,
        Err(err) => {
            warn!(error = %err, "sign-in failed");
            return errors::auth_error_to_response(err);
        }
    };

    let mut jar = cookies::set_session_cookie(jar, &signed_in.token, signed_in.expires_at, state.secure_cookies);
    let user = signed_in.user;

    let memberships = match services.workspaces(user.id).await {
        Ok(memberships) => memberships,
        Err(e) => return errors::store_error_to_response(e),
    };

    let mut active_workspace = None;
    if let [only] = memberships.as_slice() {
        match workspace::select_workspace(
            services.store(),
            services.caches(),
            jar.clone(),
            only.id,
            user.id,
            state.secure_cookies,
        )
        .await
        {
            Ok(selected) => {
                jar = selected;
                active_workspace = Some(only.id);
            }
            Err(e) => return errors::workspace_error_to_response(e),
        }
    }

    info!(user_id = %user.id, "signed in");
    (
        StatusCode::OK,
        jar,
        Json(serde_json::json!({
            "user_id": user.id.to_string(),
            "email": user.email,
            "expires_at": signed_in.expires_at.to_rfc3339(),
            "active_workspace_id": active_workspace.map(|id| id.to_string()),
        })),
    )
        .into_response()
}

/// Revoke the session and drop both cookies.
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    jar: SignedCookieJar,
) -> axum::response::Response {
    if let Err(err) = services.auth().sign_out(session.token()).await {
        return errors::auth_error_to_response(err);
    }

    if let Some(previous) = workspace::active_workspace_id(&jar) {
        services.caches().invalidate_workspace(previous);
    }
    let jar = cookies::invalidate_cookie(jar, SESSION_COOKIE, state.secure_cookies);
    let jar = workspace::clear_workspace(jar, state.secure_cookies);

    info!(user_id = %session.user_id(), "signed out");
    (StatusCode::NO_CONTENT, jar).into_response()
}
