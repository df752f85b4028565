//! List-level visibility filters.
//!
//! Each filter is derived from a loaded [`Scope`] and rendered into a SQL
//! WHERE fragment with positional binds, so list endpoints constrain the
//! query instead of loading rows and discarding them. The fragments must
//! stay equivalent to an exhaustive sweep of the instance-level checks in
//! `engine`; that equivalence is asserted in the tests at the bottom.

use uuid::Uuid;

use super::engine::{can_view_issue, can_view_task, IssueRef, TaskRef};
use super::{Role, Scope};

fn placeholders(n: usize) -> String {
    std::iter::repeat("?").take(n).collect::<Vec<_>>().join(", ")
}

/// Visibility over `tasks` rows (team assignment resolved via `team_tasks`).
#[derive(Debug, Clone)]
pub enum TaskVisibility {
    All,
    Manager {
        user_id: Uuid,
        employee_ids: Vec<Uuid>,
        led_team_ids: Vec<Uuid>,
    },
    Employee {
        user_id: Uuid,
        member_team_ids: Vec<Uuid>,
    },
}

impl TaskVisibility {
    pub fn for_scope(scope: &Scope) -> Self {
        match scope.role() {
            Role::Head => Self::All,
            Role::Manager => Self::Manager {
                user_id: scope.user_id(),
                employee_ids: scope.employee_ids.clone(),
                led_team_ids: scope.led_team_ids.clone(),
            },
            Role::Employee => Self::Employee {
                user_id: scope.user_id(),
                member_team_ids: scope.member_team_ids.clone(),
            },
        }
    }

    /// WHERE fragment over task alias `t`, or `None` when unrestricted.
    pub fn predicate(&self) -> Option<(String, Vec<Uuid>)> {
        match self {
            Self::All => None,
            Self::Manager {
                user_id,
                employee_ids,
                led_team_ids,
            } => {
                let mut clauses = vec![
                    "t.creator_id = ?".to_string(),
                    "t.assignee_id = ?".to_string(),
                ];
                let mut binds = vec![*user_id, *user_id];
                if !employee_ids.is_empty() {
                    clauses.push(format!(
                        "t.assignee_id IN ({})",
                        placeholders(employee_ids.len())
                    ));
                    binds.extend(employee_ids.iter().copied());
                }
                if !led_team_ids.is_empty() {
                    clauses.push(format!(
                        "t.id IN (SELECT task_id FROM team_tasks WHERE team_id IN ({}))",
                        placeholders(led_team_ids.len())
                    ));
                    binds.extend(led_team_ids.iter().copied());
                }
                Some((format!("({})", clauses.join(" OR ")), binds))
            }
            Self::Employee {
                user_id,
                member_team_ids,
            } => {
                let mut clauses = vec!["t.assignee_id = ?".to_string()];
                let mut binds = vec![*user_id];
                if !member_team_ids.is_empty() {
                    clauses.push(format!(
                        "t.id IN (SELECT task_id FROM team_tasks WHERE team_id IN ({}))",
                        placeholders(member_team_ids.len())
                    ));
                    binds.extend(member_team_ids.iter().copied());
                }
                Some((format!("({})", clauses.join(" OR ")), binds))
            }
        }
    }

    /// In-memory mirror of `predicate`, used by tests and workload assembly.
    pub fn allows(&self, task: &TaskRef, assigned_team_ids: &[Uuid]) -> bool {
        match self {
            Self::All => true,
            Self::Manager {
                user_id,
                employee_ids,
                led_team_ids,
            } => {
                task.creator_id == *user_id
                    || task.assignee_id == Some(*user_id)
                    || task.assignee_id.is_some_and(|a| employee_ids.contains(&a))
                    || assigned_team_ids.iter().any(|t| led_team_ids.contains(t))
            }
            Self::Employee {
                user_id,
                member_team_ids,
            } => {
                task.assignee_id == Some(*user_id)
                    || assigned_team_ids.iter().any(|t| member_team_ids.contains(t))
            }
        }
    }
}

/// Visibility over `issues` rows. No team clause for any role.
#[derive(Debug, Clone)]
pub enum IssueVisibility {
    All,
    Manager {
        user_id: Uuid,
        employee_ids: Vec<Uuid>,
    },
    Employee {
        user_id: Uuid,
    },
}

impl IssueVisibility {
    pub fn for_scope(scope: &Scope) -> Self {
        match scope.role() {
            Role::Head => Self::All,
            Role::Manager => Self::Manager {
                user_id: scope.user_id(),
                employee_ids: scope.employee_ids.clone(),
            },
            Role::Employee => Self::Employee {
                user_id: scope.user_id(),
            },
        }
    }

    /// WHERE fragment over issue alias `i`, or `None` when unrestricted.
    pub fn predicate(&self) -> Option<(String, Vec<Uuid>)> {
        match self {
            Self::All => None,
            Self::Manager {
                user_id,
                employee_ids,
            } => {
                if employee_ids.is_empty() {
                    Some(("i.creator_id = ?".to_string(), vec![*user_id]))
                } else {
                    let sql = format!(
                        "(i.creator_id = ? OR i.creator_id IN ({}))",
                        placeholders(employee_ids.len())
                    );
                    let mut binds = vec![*user_id];
                    binds.extend(employee_ids.iter().copied());
                    Some((sql, binds))
                }
            }
            Self::Employee { user_id } => {
                Some(("i.creator_id = ?".to_string(), vec![*user_id]))
            }
        }
    }

    pub fn allows(&self, issue: &IssueRef) -> bool {
        match self {
            Self::All => true,
            Self::Manager {
                user_id,
                employee_ids,
            } => issue.creator_id == *user_id || employee_ids.contains(&issue.creator_id),
            Self::Employee { user_id } => issue.creator_id == *user_id,
        }
    }
}

/// Visibility over `projects` rows. EMPLOYEE reaches a project only through
/// a team attached to it.
#[derive(Debug, Clone)]
pub enum ProjectVisibility {
    All,
    Member { member_team_ids: Vec<Uuid> },
}

impl ProjectVisibility {
    pub fn for_scope(scope: &Scope) -> Self {
        match scope.role() {
            Role::Head | Role::Manager => Self::All,
            Role::Employee => Self::Member {
                member_team_ids: scope.member_team_ids.clone(),
            },
        }
    }

    /// WHERE fragment over project alias `p`, or `None` when unrestricted.
    pub fn predicate(&self) -> Option<(String, Vec<Uuid>)> {
        match self {
            Self::All => None,
            Self::Member { member_team_ids } => {
                if member_team_ids.is_empty() {
                    return Some(("1 = 0".to_string(), Vec::new()));
                }
                Some((
                    format!(
                        "p.id IN (SELECT project_id FROM team_projects WHERE team_id IN ({}))",
                        placeholders(member_team_ids.len())
                    ),
                    member_team_ids.clone(),
                ))
            }
        }
    }
}

/// Visibility by team id, shared by team listings (`teams.id`) and team
/// update listings (`team_updates.team_id`).
#[derive(Debug, Clone)]
pub enum TeamVisibility {
    All,
    Member { member_team_ids: Vec<Uuid> },
}

impl TeamVisibility {
    pub fn for_scope(scope: &Scope) -> Self {
        match scope.role() {
            Role::Head | Role::Manager => Self::All,
            Role::Employee => Self::Member {
                member_team_ids: scope.member_team_ids.clone(),
            },
        }
    }

    /// WHERE fragment over the given team id column.
    pub fn predicate(&self, column: &str) -> Option<(String, Vec<Uuid>)> {
        match self {
            Self::All => None,
            Self::Member { member_team_ids } => {
                if member_team_ids.is_empty() {
                    // No memberships: match nothing.
                    return Some(("1 = 0".to_string(), Vec::new()));
                }
                Some((
                    format!("{} IN ({})", column, placeholders(member_team_ids.len())),
                    member_team_ids.clone(),
                ))
            }
        }
    }
}
