use std::collections::HashMap;

use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::authz::{self, Directory, Principal, Scope, TaskRef, TaskVisibility};
use crate::errors::{AppError, AppResult};
use crate::models::task::{
    DbTask, Task, TaskCreateRequest, TaskPriority, TaskStatus, TaskType, TaskUpdateRequest,
};
use crate::utils::utc_now;

const TASK_COLUMNS: &str = "t.id, t.title, t.description, t.status, t.priority, t.task_type, \
     t.creator_id, t.assignee_id, t.due_date, t.created_at, t.updated_at";

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// Restrict to one user's assigned tasks; requires self/managee/HEAD.
    pub user_id: Option<Uuid>,
}

pub async fn list(
    pool: &SqlitePool,
    principal: &Principal,
    filters: TaskFilters,
) -> AppResult<Vec<Task>> {
    let scope = Scope::load(pool, *principal).await?;

    let mut clauses: Vec<String> = Vec::new();
    let mut uuid_binds: Vec<Uuid> = Vec::new();

    // A `user_id` filter is itself an access question: the viewer must pass
    // the instance-level check for that user's records before any
    // status-filtered list is computed. Prevents role-filter bypass via
    // query parameters.
    if let Some(target) = filters.user_id {
        if !authz::can_view_user_workload(&scope, target) {
            return Err(AppError::forbidden("not allowed to view this user's tasks"));
        }
        clauses.push("t.assignee_id = ?".to_string());
        uuid_binds.push(target);
    } else if let Some((clause, vb)) = TaskVisibility::for_scope(&scope).predicate() {
        clauses.push(clause);
        uuid_binds.extend(vb);
    }

    if filters.status.is_some() {
        clauses.push("t.status = ?".to_string());
    }
    if filters.priority.is_some() {
        clauses.push("t.priority = ?".to_string());
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {} FROM tasks t{} ORDER BY t.created_at DESC",
        TASK_COLUMNS, where_sql
    );

    let mut query = sqlx::query_as::<_, DbTask>(&sql);
    for id in uuid_binds {
        query = query.bind(id);
    }
    if let Some(status) = filters.status {
        query = query.bind(status);
    }
    if let Some(priority) = filters.priority {
        query = query.bind(priority);
    }
    let rows = query.fetch_all(pool).await?;

    attach_team_ids(pool, rows).await
}

pub async fn get(pool: &SqlitePool, principal: &Principal, id: Uuid) -> AppResult<Task> {
    let task = fetch_task(pool, id).await?;
    let team_ids = Directory::new(pool).task_team_ids(id).await?;
    let scope = Scope::load(pool, *principal).await?;

    let task_ref = TaskRef {
        creator_id: task.creator_id,
        assignee_id: task.assignee_id,
    };
    if !authz::can_view_task(&scope, &task_ref, &team_ids) {
        return Err(AppError::forbidden("not allowed to view this task"));
    }

    Ok(Task::from_db(task, team_ids))
}

pub async fn create(
    pool: &SqlitePool,
    principal: &Principal,
    payload: TaskCreateRequest,
) -> AppResult<Task> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("task title must not be empty"));
    }

    let directory = Directory::new(pool);
    if let Some(assignee_id) = payload.assignee_id {
        directory
            .find_user(assignee_id)
            .await?
            .ok_or_else(|| AppError::not_found("assignee not found"))?;
    }
    if let Some(team_id) = payload.team_id {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE id = ?)")
            .bind(team_id)
            .fetch_one(pool)
            .await?;
        if !exists {
            return Err(AppError::not_found("team not found"));
        }
    }

    let scope = Scope::load(pool, *principal).await?;
    if !authz::can_create_task(&scope, payload.assignee_id, payload.team_id) {
        return Err(AppError::forbidden(
            "managers may only assign tasks to their own employees or led teams",
        ));
    }

    let id = Uuid::new_v4();
    let now = utc_now();
    let status = payload.status.unwrap_or(TaskStatus::Backlog);
    let priority = payload.priority.unwrap_or(TaskPriority::Medium);
    let task_type = if payload.team_id.is_some() {
        TaskType::Team
    } else {
        TaskType::Individual
    };

    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO tasks (id, title, description, status, priority, task_type, creator_id, assignee_id, due_date, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(status)
    .bind(priority)
    .bind(task_type)
    .bind(principal.id)
    .bind(payload.assignee_id)
    .bind(payload.due_date)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    if let Some(team_id) = payload.team_id {
        sqlx::query(
            "INSERT INTO team_tasks (id, task_id, team_id, assigned_at) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(team_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    let task = fetch_task(pool, id).await?;
    let team_ids = Directory::new(pool).task_team_ids(id).await?;
    Ok(Task::from_db(task, team_ids))
}

pub async fn update(
    pool: &SqlitePool,
    principal: &Principal,
    id: Uuid,
    payload: TaskUpdateRequest,
) -> AppResult<Task> {
    let mut task = fetch_task(pool, id).await?;
    let directory = Directory::new(pool);
    let team_ids = directory.task_team_ids(id).await?;

    // Dangling references are reported before any permission verdict,
    // matching `create`.
    if let Some(assignee_id) = payload.assignee_id {
        directory
            .find_user(assignee_id)
            .await?
            .ok_or_else(|| AppError::not_found("assignee not found"))?;
    }

    let scope = Scope::load(pool, *principal).await?;
    let task_ref = TaskRef {
        creator_id: task.creator_id,
        assignee_id: task.assignee_id,
    };
    if !authz::can_update_task(&scope, &task_ref, &team_ids, payload.touches_more_than_status()) {
        return Err(AppError::forbidden("not allowed to update this task"));
    }

    if let Some(title) = payload.title {
        if title.trim().is_empty() {
            return Err(AppError::bad_request("task title must not be empty"));
        }
        task.title = title;
    }
    if payload.description.is_some() {
        task.description = payload.description;
    }
    if let Some(status) = payload.status {
        task.status = status;
    }
    if let Some(priority) = payload.priority {
        task.priority = priority;
    }
    if let Some(assignee_id) = payload.assignee_id {
        task.assignee_id = Some(assignee_id);
    }
    if let Some(due_date) = payload.due_date {
        task.due_date = Some(due_date);
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE tasks SET title = ?, description = ?, status = ?, priority = ?, assignee_id = ?, due_date = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status)
    .bind(task.priority)
    .bind(task.assignee_id)
    .bind(task.due_date)
    .bind(now)
    .bind(task.id)
    .execute(pool)
    .await?;

    task.updated_at = now;
    Ok(Task::from_db(task, team_ids))
}

pub async fn delete(pool: &SqlitePool, principal: &Principal, id: Uuid) -> AppResult<()> {
    let task = fetch_task(pool, id).await?;
    let scope = Scope::load(pool, *principal).await?;

    let task_ref = TaskRef {
        creator_id: task.creator_id,
        assignee_id: task.assignee_id,
    };
    if !authz::can_delete_task(&scope, &task_ref) {
        return Err(AppError::forbidden("not allowed to delete this task"));
    }

    // team_tasks and team_updates rows go with the task via FK cascade.
    let affected = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("task not found"));
    }

    Ok(())
}

/// "What's on X's plate": tasks assigned to the user directly or through a
/// team membership, restricted to ONGOING/BACKLOG.
pub async fn active_for_user(
    pool: &SqlitePool,
    principal: &Principal,
    user_id: Uuid,
) -> AppResult<Vec<Task>> {
    let scope = Scope::load(pool, *principal).await?;
    if !authz::can_view_user_workload(&scope, user_id) {
        return Err(AppError::forbidden("not allowed to view this user's tasks"));
    }

    let directory = Directory::new(pool);
    directory
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    let member_team_ids = directory.team_ids_joined_by(user_id).await?;

    let vis = TaskVisibility::Employee {
        user_id,
        member_team_ids,
    };
    let (clause, binds) = match vis.predicate() {
        Some(parts) => parts,
        None => (String::from("1 = 1"), Vec::new()),
    };

    let sql = format!(
        "SELECT {} FROM tasks t WHERE {} AND t.status IN ('ONGOING', 'BACKLOG') ORDER BY t.created_at DESC",
        TASK_COLUMNS, clause
    );
    let mut query = sqlx::query_as::<_, DbTask>(&sql);
    for id in binds {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;

    attach_team_ids(pool, rows).await
}

async fn fetch_task(pool: &SqlitePool, id: Uuid) -> AppResult<DbTask> {
    sqlx::query_as::<_, DbTask>(&format!("SELECT {} FROM tasks t WHERE t.id = ?", TASK_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("task not found"))
}

/// Resolve team assignments for a page of tasks in one query.
async fn attach_team_ids(pool: &SqlitePool, rows: Vec<DbTask>) -> AppResult<Vec<Task>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = std::iter::repeat("?")
        .take(rows.len())
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT task_id, team_id FROM team_tasks WHERE task_id IN ({})",
        placeholders
    );
    let mut query = sqlx::query_as::<_, (Uuid, Uuid)>(&sql);
    for row in &rows {
        query = query.bind(row.id);
    }
    let links = query.fetch_all(pool).await?;

    let mut by_task: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (task_id, team_id) in links {
        by_task.entry(task_id).or_default().push(team_id);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let team_ids = by_task.remove(&row.id).unwrap_or_default();
            Task::from_db(row, team_ids)
        })
        .collect())
}
