//! Instance-level authorization rules.
//!
//! Pure functions over a loaded [`Scope`] and minimal entity snapshots.
//! Evaluation order per entity:
//! 1. HEAD -> allow
//! 2. ownership (creator/assignee) -> allow, short-circuiting hierarchy rules
//! 3. hierarchy (manages the assignee, leads/belongs to the team) -> allow
//! 4. deny
//!
//! Denials are logged at debug level; callers translate a `false` into
//! `AppError::Forbidden`.

use uuid::Uuid;

use super::{Role, Scope};

/// Task fields the rules care about.
#[derive(Debug, Clone, Copy)]
pub struct TaskRef {
    pub creator_id: Uuid,
    pub assignee_id: Option<Uuid>,
}

/// Issue fields the rules care about. `creator_manager_id` is resolved by the
/// service alongside the issue row so the check stays pure.
#[derive(Debug, Clone, Copy)]
pub struct IssueRef {
    pub creator_id: Uuid,
    pub creator_manager_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy)]
pub struct TeamRef {
    pub id: Uuid,
    pub leader_id: Option<Uuid>,
}

fn deny(scope: &Scope, entity: &'static str, action: &'static str) -> bool {
    tracing::debug!(
        user_id = %scope.user_id(),
        role = ?scope.role(),
        entity,
        action,
        "access denied"
    );
    false
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// HEAD and MANAGER always see projects; EMPLOYEE only through a team
/// attached to the project (resolved by the caller via the Directory).
pub fn can_view_project(scope: &Scope, member_of_attached_team: bool) -> bool {
    match scope.role() {
        Role::Head | Role::Manager => true,
        Role::Employee => member_of_attached_team || deny(scope, "project", "view"),
    }
}

/// Project create/update/delete are HEAD-only.
pub fn can_manage_project(scope: &Scope) -> bool {
    scope.role().is_head() || deny(scope, "project", "manage")
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

pub fn can_view_team(scope: &Scope, team_id: Uuid) -> bool {
    match scope.role() {
        Role::Head | Role::Manager => true,
        Role::Employee => scope.member_of(team_id) || deny(scope, "team", "view"),
    }
}

pub fn can_create_team(scope: &Scope) -> bool {
    scope.role().is_head() || deny(scope, "team", "create")
}

/// HEAD may update anything; the leader may update everything except the
/// leadership itself. Leader reassignment is HEAD-only regardless of caller.
pub fn can_update_team(scope: &Scope, team: &TeamRef, changes_leader: bool) -> bool {
    if scope.role().is_head() {
        return true;
    }
    if changes_leader {
        return deny(scope, "team", "reassign_leader");
    }
    team.leader_id == Some(scope.user_id()) || deny(scope, "team", "update")
}

pub fn can_delete_team(scope: &Scope) -> bool {
    scope.role().is_head() || deny(scope, "team", "delete")
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

pub fn can_view_task(scope: &Scope, task: &TaskRef, assigned_team_ids: &[Uuid]) -> bool {
    match scope.role() {
        Role::Head => true,
        Role::Manager => {
            task.creator_id == scope.user_id()
                || task.assignee_id == Some(scope.user_id())
                || task.assignee_id.is_some_and(|a| scope.manages(a))
                || assigned_team_ids.iter().any(|t| scope.leads(*t))
                || deny(scope, "task", "view")
        }
        Role::Employee => {
            task.assignee_id == Some(scope.user_id())
                || assigned_team_ids.iter().any(|t| scope.member_of(*t))
                || deny(scope, "task", "view")
        }
    }
}

/// Task creation is HEAD/MANAGER only, and a MANAGER may only direct the task
/// at their own employees (or themselves) and at teams they lead.
pub fn can_create_task(scope: &Scope, assignee_id: Option<Uuid>, team_id: Option<Uuid>) -> bool {
    match scope.role() {
        Role::Head => true,
        Role::Manager => {
            let assignee_ok = match assignee_id {
                None => true,
                Some(a) => a == scope.user_id() || scope.manages(a),
            };
            let team_ok = team_id.map_or(true, |t| scope.leads(t));
            (assignee_ok && team_ok) || deny(scope, "task", "create")
        }
        Role::Employee => deny(scope, "task", "create"),
    }
}

/// Same actor set as `can_view_task`, except EMPLOYEE may only change the
/// status: a patch touching any other field is rejected outright rather
/// than partially applied.
pub fn can_update_task(
    scope: &Scope,
    task: &TaskRef,
    assigned_team_ids: &[Uuid],
    touches_more_than_status: bool,
) -> bool {
    if scope.role() == Role::Employee && touches_more_than_status {
        return deny(scope, "task", "update_non_status");
    }
    can_view_task(scope, task, assigned_team_ids)
}

pub fn can_delete_task(scope: &Scope, task: &TaskRef) -> bool {
    match scope.role() {
        Role::Head => true,
        Role::Manager => {
            task.creator_id == scope.user_id()
                || task.assignee_id == Some(scope.user_id())
                || task.assignee_id.is_some_and(|a| scope.manages(a))
                || deny(scope, "task", "delete")
        }
        Role::Employee => task.assignee_id == Some(scope.user_id()) || deny(scope, "task", "delete"),
    }
}

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

/// Issues have no team-based visibility, unlike tasks.
pub fn can_view_issue(scope: &Scope, issue: &IssueRef) -> bool {
    match scope.role() {
        Role::Head => true,
        Role::Manager => {
            issue.creator_id == scope.user_id()
                || issue.creator_manager_id == Some(scope.user_id())
                || deny(scope, "issue", "view")
        }
        Role::Employee => issue.creator_id == scope.user_id() || deny(scope, "issue", "view"),
    }
}

/// The creator may edit everything; HEAD and the creator's manager may only
/// move the status.
pub fn can_update_issue(scope: &Scope, issue: &IssueRef, touches_non_status: bool) -> bool {
    if issue.creator_id == scope.user_id() {
        return true;
    }
    if touches_non_status {
        return deny(scope, "issue", "update_non_status");
    }
    can_view_issue(scope, issue)
}

pub fn can_delete_issue(scope: &Scope) -> bool {
    scope.role().is_head() || deny(scope, "issue", "delete")
}

// ---------------------------------------------------------------------------
// TeamUpdate
// ---------------------------------------------------------------------------

pub fn can_view_team_update(scope: &Scope, team_id: Uuid) -> bool {
    match scope.role() {
        Role::Head | Role::Manager => true,
        Role::Employee => scope.member_of(team_id) || deny(scope, "team_update", "view"),
    }
}

/// Posting an update requires membership of the target team, for every role.
pub fn can_create_team_update(scope: &Scope, team_id: Uuid) -> bool {
    scope.member_of(team_id) || deny(scope, "team_update", "create")
}

/// Only the author edits an update, and only its content.
pub fn can_update_team_update(scope: &Scope, author_id: Uuid) -> bool {
    author_id == scope.user_id() || deny(scope, "team_update", "update")
}

pub fn can_delete_team_update(scope: &Scope, author_id: Uuid, team_id: Uuid) -> bool {
    scope.role().is_head()
        || scope.leads(team_id)
        || author_id == scope.user_id()
        || deny(scope, "team_update", "delete")
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Viewing another user's plate ("active tasks for X") requires being X,
/// X's manager, or HEAD. Guards against role-filter bypass via `?user_id=`.
pub fn can_view_user_workload(scope: &Scope, target_user_id: Uuid) -> bool {
    scope.role().is_head()
        || target_user_id == scope.user_id()
        || scope.manages(target_user_id)
        || deny(scope, "dashboard", "view_user")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::Principal;

    fn scope(role: Role) -> Scope {
        Scope {
            principal: Principal {
                id: Uuid::new_v4(),
                role,
            },
            employee_ids: Vec::new(),
            led_team_ids: Vec::new(),
            member_team_ids: Vec::new(),
        }
    }

    #[test]
    fn head_sees_and_manages_everything() {
        let s = scope(Role::Head);
        let task = TaskRef {
            creator_id: Uuid::new_v4(),
            assignee_id: None,
        };
        assert!(can_view_task(&s, &task, &[]));
        assert!(can_delete_task(&s, &task));
        assert!(can_manage_project(&s));
        assert!(can_create_team(&s));
        assert!(can_delete_issue(&s));
    }

    #[test]
    fn manager_ownership_short_circuits_hierarchy() {
        // The manager neither manages the assignee nor leads any team, but
        // created the task themselves: ownership wins.
        let s = scope(Role::Manager);
        let task = TaskRef {
            creator_id: s.user_id(),
            assignee_id: Some(Uuid::new_v4()),
        };
        assert!(can_view_task(&s, &task, &[]));
        assert!(can_update_task(&s, &task, &[], true));
        assert!(can_delete_task(&s, &task));
    }

    #[test]
    fn manager_sees_subordinate_tasks_only() {
        let mut s = scope(Role::Manager);
        let employee = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        s.employee_ids.push(employee);

        let theirs = TaskRef {
            creator_id: Uuid::new_v4(),
            assignee_id: Some(employee),
        };
        let not_theirs = TaskRef {
            creator_id: Uuid::new_v4(),
            assignee_id: Some(stranger),
        };
        assert!(can_view_task(&s, &theirs, &[]));
        assert!(!can_view_task(&s, &not_theirs, &[]));
    }

    #[test]
    fn manager_sees_tasks_of_led_teams() {
        let mut s = scope(Role::Manager);
        let team = Uuid::new_v4();
        s.led_team_ids.push(team);

        let task = TaskRef {
            creator_id: Uuid::new_v4(),
            assignee_id: None,
        };
        assert!(can_view_task(&s, &task, &[team]));
        assert!(!can_view_task(&s, &task, &[Uuid::new_v4()]));
    }

    #[test]
    fn employee_cannot_create_tasks() {
        let s = scope(Role::Employee);
        assert!(!can_create_task(&s, None, None));
        assert!(!can_create_task(&s, Some(s.user_id()), None));
    }

    #[test]
    fn manager_assignment_limited_to_own_people_and_teams() {
        let mut s = scope(Role::Manager);
        let employee = Uuid::new_v4();
        let led = Uuid::new_v4();
        s.employee_ids.push(employee);
        s.led_team_ids.push(led);

        assert!(can_create_task(&s, Some(employee), None));
        assert!(can_create_task(&s, Some(s.user_id()), None));
        assert!(can_create_task(&s, None, Some(led)));
        assert!(!can_create_task(&s, Some(Uuid::new_v4()), None));
        assert!(!can_create_task(&s, Some(employee), Some(Uuid::new_v4())));
    }

    #[test]
    fn employee_task_patch_restricted_to_status() {
        let mut s = scope(Role::Employee);
        let team = Uuid::new_v4();
        s.member_team_ids.push(team);

        let task = TaskRef {
            creator_id: Uuid::new_v4(),
            assignee_id: Some(s.user_id()),
        };
        assert!(can_update_task(&s, &task, &[team], false));
        // Anything beyond the status denies the whole patch.
        assert!(!can_update_task(&s, &task, &[team], true));
    }

    #[test]
    fn leader_reassignment_is_head_only() {
        let s = scope(Role::Manager);
        let team = TeamRef {
            id: Uuid::new_v4(),
            // The caller IS the current leader, and still may not reassign.
            leader_id: Some(s.user_id()),
        };
        assert!(can_update_team(&s, &team, false));
        assert!(!can_update_team(&s, &team, true));
        assert!(can_update_team(&scope(Role::Head), &team, true));
    }

    #[test]
    fn issue_visibility_has_no_team_clause() {
        let mut s = scope(Role::Employee);
        s.member_team_ids.push(Uuid::new_v4());

        let own = IssueRef {
            creator_id: s.user_id(),
            creator_manager_id: None,
        };
        let teammate = IssueRef {
            creator_id: Uuid::new_v4(),
            creator_manager_id: None,
        };
        assert!(can_view_issue(&s, &own));
        assert!(!can_view_issue(&s, &teammate));
    }

    #[test]
    fn issue_status_transition_actors() {
        let mut s = scope(Role::Manager);
        let employee = Uuid::new_v4();
        s.employee_ids.push(employee);

        let issue = IssueRef {
            creator_id: employee,
            creator_manager_id: Some(s.user_id()),
        };
        assert!(can_update_issue(&s, &issue, false));
        assert!(!can_update_issue(&s, &issue, true));

        let creator = Scope {
            principal: Principal {
                id: employee,
                role: Role::Employee,
            },
            employee_ids: Vec::new(),
            led_team_ids: Vec::new(),
            member_team_ids: Vec::new(),
        };
        assert!(can_update_issue(&creator, &issue, true));
    }

    #[test]
    fn team_update_membership_required_even_for_head() {
        let s = scope(Role::Head);
        assert!(!can_create_team_update(&s, Uuid::new_v4()));
    }

    #[test]
    fn team_update_delete_actors() {
        let author = Uuid::new_v4();
        let team = Uuid::new_v4();

        let mut leader = scope(Role::Manager);
        leader.led_team_ids.push(team);
        assert!(can_delete_team_update(&leader, author, team));
        assert!(can_delete_team_update(&scope(Role::Head), author, team));

        let stranger = scope(Role::Employee);
        assert!(!can_delete_team_update(&stranger, author, team));
    }

    #[test]
    fn workload_view_requires_self_managee_or_head() {
        let mut manager = scope(Role::Manager);
        let employee = Uuid::new_v4();
        manager.employee_ids.push(employee);

        assert!(can_view_user_workload(&manager, employee));
        assert!(can_view_user_workload(&manager, manager.user_id()));
        assert!(!can_view_user_workload(&manager, Uuid::new_v4()));
        assert!(can_view_user_workload(&scope(Role::Head), Uuid::new_v4()));
    }
}
