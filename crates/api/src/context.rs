use jurnal_auth::{CurrentUser, SessionToken};
use jurnal_core::{UserId, WorkspaceId};

/// Signed-in user for a request.
///
/// Inserted by the session middleware; present on every authenticated route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    user: CurrentUser,
    token: SessionToken,
}

impl SessionContext {
    pub fn new(user: CurrentUser, token: SessionToken) -> Self {
        Self { user, token }
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }
}

/// Active workspace for a request, already checked against membership.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WorkspaceContext {
    workspace_id: WorkspaceId,
}

impl WorkspaceContext {
    pub fn new(workspace_id: WorkspaceId) -> Self {
        Self { workspace_id }
    }

    pub fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }
}
