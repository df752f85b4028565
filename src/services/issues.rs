use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::authz::{self, IssueRef, IssueVisibility, Principal, Scope};
use crate::errors::{AppError, AppResult};
use crate::models::issue::{DbIssue, Issue, IssueCreateRequest, IssueStatus, IssueUpdateRequest};
use crate::utils::utc_now;

const ISSUE_COLUMNS: &str =
    "i.id, i.title, i.description, i.status, i.creator_id, i.task_id, i.created_at, i.updated_at";

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct IssueFilters {
    pub status: Option<IssueStatus>,
}

pub async fn list(
    pool: &SqlitePool,
    principal: &Principal,
    filters: IssueFilters,
) -> AppResult<Vec<Issue>> {
    let scope = Scope::load(pool, *principal).await?;

    let mut clauses: Vec<String> = Vec::new();
    let mut uuid_binds: Vec<Uuid> = Vec::new();
    if let Some((clause, vb)) = IssueVisibility::for_scope(&scope).predicate() {
        clauses.push(clause);
        uuid_binds.extend(vb);
    }
    if filters.status.is_some() {
        clauses.push("i.status = ?".to_string());
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {} FROM issues i{} ORDER BY i.created_at DESC",
        ISSUE_COLUMNS, where_sql
    );

    let mut query = sqlx::query_as::<_, DbIssue>(&sql);
    for id in uuid_binds {
        query = query.bind(id);
    }
    if let Some(status) = filters.status {
        query = query.bind(status);
    }
    let rows = query.fetch_all(pool).await?;

    Ok(rows.into_iter().map(Issue::from).collect())
}

pub async fn get(pool: &SqlitePool, principal: &Principal, id: Uuid) -> AppResult<Issue> {
    let issue = fetch_issue(pool, id).await?;
    let issue_ref = issue_ref(pool, &issue).await?;
    let scope = Scope::load(pool, *principal).await?;
    if !authz::can_view_issue(&scope, &issue_ref) {
        return Err(AppError::forbidden("not allowed to view this issue"));
    }

    Ok(issue.into())
}

/// Any authenticated user may report an issue.
pub async fn create(
    pool: &SqlitePool,
    principal: &Principal,
    payload: IssueCreateRequest,
) -> AppResult<Issue> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("issue title must not be empty"));
    }
    if payload.description.trim().is_empty() {
        return Err(AppError::bad_request("issue description must not be empty"));
    }
    if let Some(task_id) = payload.task_id {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?)")
            .bind(task_id)
            .fetch_one(pool)
            .await?;
        if !exists {
            return Err(AppError::not_found("task not found"));
        }
    }

    let id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query(
        "INSERT INTO issues (id, title, description, status, creator_id, task_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(IssueStatus::Open)
    .bind(principal.id)
    .bind(payload.task_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(fetch_issue(pool, id).await?.into())
}

pub async fn update(
    pool: &SqlitePool,
    principal: &Principal,
    id: Uuid,
    payload: IssueUpdateRequest,
) -> AppResult<Issue> {
    let mut issue = fetch_issue(pool, id).await?;

    // Dangling references are reported before any permission verdict,
    // matching `create`.
    if let Some(task_id) = payload.task_id {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?)")
            .bind(task_id)
            .fetch_one(pool)
            .await?;
        if !exists {
            return Err(AppError::not_found("task not found"));
        }
    }

    let issue_ref = issue_ref(pool, &issue).await?;
    let scope = Scope::load(pool, *principal).await?;
    if !authz::can_update_issue(&scope, &issue_ref, payload.touches_non_status()) {
        return Err(AppError::forbidden("not allowed to update this issue"));
    }

    if let Some(title) = payload.title {
        if title.trim().is_empty() {
            return Err(AppError::bad_request("issue title must not be empty"));
        }
        issue.title = title;
    }
    if let Some(description) = payload.description {
        issue.description = description;
    }
    if let Some(status) = payload.status {
        issue.status = status;
    }
    if let Some(task_id) = payload.task_id {
        issue.task_id = Some(task_id);
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE issues SET title = ?, description = ?, status = ?, task_id = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&issue.title)
    .bind(&issue.description)
    .bind(issue.status)
    .bind(issue.task_id)
    .bind(now)
    .bind(issue.id)
    .execute(pool)
    .await?;

    issue.updated_at = now;
    Ok(issue.into())
}

pub async fn delete(pool: &SqlitePool, principal: &Principal, id: Uuid) -> AppResult<()> {
    let _ = fetch_issue(pool, id).await?;
    let scope = Scope::load(pool, *principal).await?;
    if !authz::can_delete_issue(&scope) {
        return Err(AppError::forbidden("only HEAD may delete issues"));
    }

    let affected = sqlx::query("DELETE FROM issues WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("issue not found"));
    }

    Ok(())
}

/// "Open items reported by X", used by the workload dashboard:
/// OPEN/IN_PROGRESS only. Caller authorization happens in the dashboard
/// handler alongside the task half.
pub async fn active_for_user(pool: &SqlitePool, user_id: Uuid) -> AppResult<Vec<Issue>> {
    let rows = sqlx::query_as::<_, DbIssue>(&format!(
        "SELECT {} FROM issues i WHERE i.creator_id = ? AND i.status IN ('OPEN', 'IN_PROGRESS') ORDER BY i.created_at DESC",
        ISSUE_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Issue::from).collect())
}

async fn fetch_issue(pool: &SqlitePool, id: Uuid) -> AppResult<DbIssue> {
    sqlx::query_as::<_, DbIssue>(&format!("SELECT {} FROM issues i WHERE i.id = ?", ISSUE_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("issue not found"))
}

/// Snapshot for the rule functions; resolves the creator's manager once.
async fn issue_ref(pool: &SqlitePool, issue: &DbIssue) -> AppResult<IssueRef> {
    let creator_manager_id: Option<Uuid> =
        sqlx::query_scalar("SELECT manager_id FROM users WHERE id = ?")
            .bind(issue.creator_id)
            .fetch_optional(pool)
            .await?
            .flatten();

    Ok(IssueRef {
        creator_id: issue.creator_id,
        creator_manager_id,
    })
}
