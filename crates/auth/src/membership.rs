use serde::{Deserialize, Serialize};

use jurnal_core::{Entity, UserId, WorkspaceId};

use crate::Role;

/// Tenant boundary: every account and transaction belongs to exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub owner_id: UserId,
}

impl Entity for Workspace {
    type Id = WorkspaceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A user's membership in a workspace.
///
/// This is an authorization boundary object: holding one is what allows a
/// workspace to become the active one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMembership {
    pub workspace_id: WorkspaceId,
    pub user_id: UserId,
    pub role: Role,
}

/// Row of the workspace picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSummary {
    pub id: WorkspaceId,
    pub name: String,
    pub role: Role,
}
