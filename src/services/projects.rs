use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::{self, Directory, Principal, ProjectVisibility, Scope};
use crate::errors::{AppError, AppResult};
use crate::models::project::{
    DbProject, Project, ProjectCreateRequest, ProjectStatus, ProjectUpdateRequest,
};
use crate::utils::utc_now;

const PROJECT_COLUMNS: &str =
    "id, name, description, start_date, end_date, status, creator_id, created_at, updated_at";

pub async fn list(pool: &SqlitePool, principal: &Principal) -> AppResult<Vec<Project>> {
    let scope = Scope::load(pool, *principal).await?;
    let vis = ProjectVisibility::for_scope(&scope);

    let mut sql = format!(
        "SELECT {} FROM projects p ORDER BY created_at DESC",
        PROJECT_COLUMNS
    );
    let mut binds: Vec<Uuid> = Vec::new();
    if let Some((clause, vb)) = vis.predicate() {
        sql = format!(
            "SELECT {} FROM projects p WHERE {} ORDER BY created_at DESC",
            PROJECT_COLUMNS, clause
        );
        binds = vb;
    }

    let mut query = sqlx::query_as::<_, DbProject>(&sql);
    for id in binds {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;

    Ok(rows.into_iter().map(Project::from).collect())
}

pub async fn get(pool: &SqlitePool, principal: &Principal, id: Uuid) -> AppResult<Project> {
    let row = fetch_project(pool, id).await?;
    let scope = Scope::load(pool, *principal).await?;

    let member_of_attached = if scope.role().is_head() || scope.role().is_manager() {
        true
    } else {
        Directory::new(pool)
            .is_member_of_project_team(principal.id, id)
            .await?
    };
    if !authz::can_view_project(&scope, member_of_attached) {
        return Err(AppError::forbidden("not allowed to view this project"));
    }

    Ok(row.into())
}

pub async fn create(
    pool: &SqlitePool,
    principal: &Principal,
    payload: ProjectCreateRequest,
) -> AppResult<Project> {
    let scope = Scope::load(pool, *principal).await?;
    if !authz::can_manage_project(&scope) {
        return Err(AppError::forbidden("only HEAD may create projects"));
    }

    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("project name must not be empty"));
    }
    if let Some(end) = payload.end_date {
        if end < payload.start_date {
            return Err(AppError::bad_request("end_date must be >= start_date"));
        }
    }

    let id = Uuid::new_v4();
    let now = utc_now();
    let status = payload.status.unwrap_or(ProjectStatus::Planning);

    sqlx::query(
        "INSERT INTO projects (id, name, description, start_date, end_date, status, creator_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(status)
    .bind(principal.id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(fetch_project(pool, id).await?.into())
}

pub async fn update(
    pool: &SqlitePool,
    principal: &Principal,
    id: Uuid,
    payload: ProjectUpdateRequest,
) -> AppResult<Project> {
    let mut project = fetch_project(pool, id).await?;
    let scope = Scope::load(pool, *principal).await?;
    if !authz::can_manage_project(&scope) {
        return Err(AppError::forbidden("only HEAD may update projects"));
    }

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::bad_request("project name must not be empty"));
        }
        project.name = name;
    }
    if payload.description.is_some() {
        project.description = payload.description;
    }
    if let Some(start) = payload.start_date {
        project.start_date = start;
    }
    if let Some(end) = payload.end_date {
        project.end_date = Some(end);
    }
    if let Some(status) = payload.status {
        project.status = status;
    }
    if let Some(end) = project.end_date {
        if end < project.start_date {
            return Err(AppError::bad_request("end_date must be >= start_date"));
        }
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE projects SET name = ?, description = ?, start_date = ?, end_date = ?, status = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.start_date)
    .bind(project.end_date)
    .bind(project.status)
    .bind(now)
    .bind(project.id)
    .execute(pool)
    .await?;

    project.updated_at = now;
    Ok(project.into())
}

pub async fn delete(pool: &SqlitePool, principal: &Principal, id: Uuid) -> AppResult<()> {
    let _ = fetch_project(pool, id).await?;
    let scope = Scope::load(pool, *principal).await?;
    if !authz::can_manage_project(&scope) {
        return Err(AppError::forbidden("only HEAD may delete projects"));
    }

    let affected = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("project not found"));
    }

    Ok(())
}

async fn fetch_project(pool: &SqlitePool, id: Uuid) -> AppResult<DbProject> {
    sqlx::query_as::<_, DbProject>(&format!(
        "SELECT {} FROM projects WHERE id = ?",
        PROJECT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("project not found"))
}
