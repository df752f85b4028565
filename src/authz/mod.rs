//! Authorization module
//!
//! Every read and write in the API flows through this module:
//! - instance-level allow/deny checks in [`engine`]
//! - list-level visibility filters in [`visibility`]
//! - the per-request [`Scope`] of directory relationships in [`directory`]
//!
//! Handlers never branch on roles themselves; they load a `Scope` once and
//! call the rule functions with it.

mod directory;
mod engine;
mod visibility;

pub use directory::{Directory, Scope};
pub use engine::*;
pub use visibility::{IssueVisibility, ProjectVisibility, TaskVisibility, TeamVisibility};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Hierarchy roles, top-down. Stored as TEXT in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Head,
    Manager,
    Employee,
}

impl Role {
    pub fn is_head(self) -> bool {
        matches!(self, Role::Head)
    }

    pub fn is_manager(self) -> bool {
        matches!(self, Role::Manager)
    }

    /// Roles eligible to lead a team or carry a `manager_id`.
    pub fn can_lead(self) -> bool {
        matches!(self, Role::Manager | Role::Employee)
    }
}

/// The authenticated caller. Extracted from the bearer token by the
/// `FromRequestParts` impl in `jwt.rs` and passed explicitly into every
/// service call; there is no ambient session state.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}
