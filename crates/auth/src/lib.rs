//! `jurnal-auth`: authentication and workspace-membership boundary.
//!
//! No HTTP and no storage here: this crate defines the
//! session model, the membership model and the `AuthProvider` seam that
//! adapters implement.

pub mod error;
pub mod membership;
pub mod provider;
pub mod roles;
pub mod session;

pub use error::AuthError;
pub use membership::{Workspace, WorkspaceMembership, WorkspaceSummary};
pub use provider::{AuthProvider, SignedIn};
pub use roles::Role;
pub use session::{
    CurrentUser, SessionClaims, SessionToken, normalize_email, validate_session,
};
