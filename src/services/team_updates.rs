use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::authz::{self, Principal, Scope, TeamVisibility};
use crate::errors::{AppError, AppResult};
use crate::models::team_update::{
    DbTeamUpdate, TeamUpdate, TeamUpdateCreateRequest, TeamUpdateEditRequest,
};
use crate::utils::utc_now;

// Author resolved through team_members so the rules can compare user ids.
const UPDATE_COLUMNS: &str = "u.id, u.content, u.member_id, u.team_id, u.task_id, \
     tm.user_id AS author_id, u.created_at";
const UPDATE_FROM: &str = "team_updates u INNER JOIN team_members tm ON tm.id = u.member_id";

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TeamUpdateFilters {
    pub team_id: Option<Uuid>,
}

pub async fn list(
    pool: &SqlitePool,
    principal: &Principal,
    filters: TeamUpdateFilters,
) -> AppResult<Vec<TeamUpdate>> {
    let scope = Scope::load(pool, *principal).await?;

    let mut clauses: Vec<String> = Vec::new();
    let mut binds: Vec<Uuid> = Vec::new();
    if let Some((clause, vb)) = TeamVisibility::for_scope(&scope).predicate("u.team_id") {
        clauses.push(clause);
        binds.extend(vb);
    }
    if let Some(team_id) = filters.team_id {
        clauses.push("u.team_id = ?".to_string());
        binds.push(team_id);
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {} FROM {}{} ORDER BY u.created_at DESC",
        UPDATE_COLUMNS, UPDATE_FROM, where_sql
    );

    let mut query = sqlx::query_as::<_, DbTeamUpdate>(&sql);
    for id in binds {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;

    Ok(rows.into_iter().map(TeamUpdate::from).collect())
}

pub async fn get(pool: &SqlitePool, principal: &Principal, id: Uuid) -> AppResult<TeamUpdate> {
    let update = fetch_update(pool, id).await?;
    let scope = Scope::load(pool, *principal).await?;
    if !authz::can_view_team_update(&scope, update.team_id) {
        return Err(AppError::forbidden("not allowed to view this update"));
    }

    Ok(update.into())
}

pub async fn create(
    pool: &SqlitePool,
    principal: &Principal,
    payload: TeamUpdateCreateRequest,
) -> AppResult<TeamUpdate> {
    if payload.content.trim().is_empty() {
        return Err(AppError::bad_request("update content must not be empty"));
    }

    let team_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE id = ?)")
        .bind(payload.team_id)
        .fetch_one(pool)
        .await?;
    if !team_exists {
        return Err(AppError::not_found("team not found"));
    }

    // Membership is checked against the exact team the update is posted to.
    let scope = Scope::load(pool, *principal).await?;
    if !authz::can_create_team_update(&scope, payload.team_id) {
        return Err(AppError::forbidden("only team members may post updates"));
    }

    let member_id: Uuid = sqlx::query_scalar(
        "SELECT id FROM team_members WHERE user_id = ? AND team_id = ?",
    )
    .bind(principal.id)
    .bind(payload.team_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::forbidden("only team members may post updates"))?;

    let task_id = match payload.team_task_id {
        None => None,
        Some(team_task_id) => {
            let link: Option<(Uuid, Uuid)> = sqlx::query_as(
                "SELECT task_id, team_id FROM team_tasks WHERE id = ?",
            )
            .bind(team_task_id)
            .fetch_optional(pool)
            .await?;
            let (task_id, link_team_id) =
                link.ok_or_else(|| AppError::not_found("team task not found"))?;
            if link_team_id != payload.team_id {
                return Err(AppError::bad_request(
                    "team_task_id does not belong to the given team",
                ));
            }
            Some(task_id)
        }
    };

    let id = Uuid::new_v4();
    let now = utc_now();
    sqlx::query(
        "INSERT INTO team_updates (id, content, member_id, team_id, task_id, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&payload.content)
    .bind(member_id)
    .bind(payload.team_id)
    .bind(task_id)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(fetch_update(pool, id).await?.into())
}

/// Content-only edit, restricted to the author.
pub async fn update(
    pool: &SqlitePool,
    principal: &Principal,
    id: Uuid,
    payload: TeamUpdateEditRequest,
) -> AppResult<TeamUpdate> {
    let update = fetch_update(pool, id).await?;
    let scope = Scope::load(pool, *principal).await?;
    if !authz::can_update_team_update(&scope, update.author_id) {
        return Err(AppError::forbidden("only the author may edit an update"));
    }
    if payload.content.trim().is_empty() {
        return Err(AppError::bad_request("update content must not be empty"));
    }

    sqlx::query("UPDATE team_updates SET content = ? WHERE id = ?")
        .bind(&payload.content)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(fetch_update(pool, id).await?.into())
}

pub async fn delete(pool: &SqlitePool, principal: &Principal, id: Uuid) -> AppResult<()> {
    let update = fetch_update(pool, id).await?;
    let scope = Scope::load(pool, *principal).await?;
    if !authz::can_delete_team_update(&scope, update.author_id, update.team_id) {
        return Err(AppError::forbidden("not allowed to delete this update"));
    }

    let affected = sqlx::query("DELETE FROM team_updates WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("team update not found"));
    }

    Ok(())
}

async fn fetch_update(pool: &SqlitePool, id: Uuid) -> AppResult<DbTeamUpdate> {
    sqlx::query_as::<_, DbTeamUpdate>(&format!(
        "SELECT {} FROM {} WHERE u.id = ?",
        UPDATE_COLUMNS, UPDATE_FROM
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("team update not found"))
}
