use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::authz::{self, Directory, Principal, Scope, TeamRef, TeamVisibility};
use crate::errors::{AppError, AppResult};
use crate::models::team::{
    DbTeam, Team, TeamCreateRequest, TeamDetail, TeamMember, TeamMemberAddRequest,
    TeamUpdateRequest,
};
use crate::utils::utc_now;

const TEAM_COLUMNS: &str =
    "id, name, description, leader_id, creator_id, created_at, updated_at";

pub async fn list(pool: &SqlitePool, principal: &Principal) -> AppResult<Vec<Team>> {
    let scope = Scope::load(pool, *principal).await?;
    let vis = TeamVisibility::for_scope(&scope);

    let mut sql = format!("SELECT {} FROM teams ORDER BY created_at DESC", TEAM_COLUMNS);
    let mut binds: Vec<Uuid> = Vec::new();
    if let Some((clause, vb)) = vis.predicate("id") {
        sql = format!(
            "SELECT {} FROM teams WHERE {} ORDER BY created_at DESC",
            TEAM_COLUMNS, clause
        );
        binds = vb;
    }

    let mut query = sqlx::query_as::<_, DbTeam>(&sql);
    for id in binds {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;

    Ok(rows.into_iter().map(Team::from).collect())
}

pub async fn get(pool: &SqlitePool, principal: &Principal, id: Uuid) -> AppResult<TeamDetail> {
    let team = fetch_team(pool, id).await?;
    let scope = Scope::load(pool, *principal).await?;
    if !authz::can_view_team(&scope, team.id) {
        return Err(AppError::forbidden("not allowed to view this team"));
    }

    let project_ids =
        sqlx::query_scalar::<_, Uuid>("SELECT project_id FROM team_projects WHERE team_id = ?")
            .bind(id)
            .fetch_all(pool)
            .await?;
    let members = fetch_members(pool, id).await?;

    Ok(TeamDetail {
        id: team.id,
        name: team.name,
        description: team.description,
        leader_id: team.leader_id,
        creator_id: team.creator_id,
        created_at: team.created_at,
        updated_at: team.updated_at,
        project_ids,
        members,
    })
}

/// Team creation is HEAD-only and atomic: the team row, the project links and
/// the leader's membership land in one transaction or not at all.
pub async fn create(
    pool: &SqlitePool,
    principal: &Principal,
    payload: TeamCreateRequest,
) -> AppResult<TeamDetail> {
    let scope = Scope::load(pool, *principal).await?;
    if !authz::can_create_team(&scope) {
        return Err(AppError::forbidden("only HEAD may create teams"));
    }

    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("team name must not be empty"));
    }
    if payload.project_ids.is_empty() {
        return Err(AppError::bad_request("at least one project is required"));
    }

    let directory = Directory::new(pool);
    let leader = directory
        .find_user(payload.leader_id)
        .await?
        .ok_or_else(|| AppError::not_found("leader not found"))?;
    if !leader.role.can_lead() {
        return Err(AppError::bad_request("leader must be a MANAGER or EMPLOYEE"));
    }
    for project_id in &payload.project_ids {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?)")
            .bind(project_id)
            .fetch_one(pool)
            .await?;
        if !exists {
            return Err(AppError::not_found(format!("project {} not found", project_id)));
        }
    }

    let team_id = Uuid::new_v4();
    let now = utc_now();

    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO teams (id, name, description, leader_id, creator_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(team_id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.leader_id)
    .bind(principal.id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for project_id in &payload.project_ids {
        sqlx::query("INSERT INTO team_projects (team_id, project_id) VALUES (?, ?)")
            .bind(team_id)
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
    }

    upsert_member(&mut tx, team_id, payload.leader_id).await?;
    tx.commit().await?;

    get(pool, principal, team_id).await
}

pub async fn update(
    pool: &SqlitePool,
    principal: &Principal,
    id: Uuid,
    payload: TeamUpdateRequest,
) -> AppResult<TeamDetail> {
    let mut team = fetch_team(pool, id).await?;
    let scope = Scope::load(pool, *principal).await?;

    let changes_leader = matches!(payload.leader_id, Some(new) if Some(new) != team.leader_id);
    let team_ref = TeamRef {
        id: team.id,
        leader_id: team.leader_id,
    };
    if !authz::can_update_team(&scope, &team_ref, changes_leader) {
        return Err(AppError::forbidden("not allowed to update this team"));
    }

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::bad_request("team name must not be empty"));
        }
        team.name = name;
    }
    if payload.description.is_some() {
        team.description = payload.description;
    }
    if changes_leader {
        if let Some(new_leader_id) = payload.leader_id {
            let leader = Directory::new(pool)
                .find_user(new_leader_id)
                .await?
                .ok_or_else(|| AppError::not_found("leader not found"))?;
            if !leader.role.can_lead() {
                return Err(AppError::bad_request("leader must be a MANAGER or EMPLOYEE"));
            }
            team.leader_id = Some(new_leader_id);
        }
    }

    let now = utc_now();
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE teams SET name = ?, description = ?, leader_id = ?, updated_at = ? WHERE id = ?")
        .bind(&team.name)
        .bind(&team.description)
        .bind(team.leader_id)
        .bind(now)
        .bind(team.id)
        .execute(&mut *tx)
        .await?;

    // The leader is never left dangling as leader-but-not-member.
    if changes_leader {
        if let Some(leader_id) = team.leader_id {
            upsert_member(&mut tx, team.id, leader_id).await?;
        }
    }
    tx.commit().await?;

    get(pool, principal, id).await
}

pub async fn delete(pool: &SqlitePool, principal: &Principal, id: Uuid) -> AppResult<()> {
    let _ = fetch_team(pool, id).await?;
    let scope = Scope::load(pool, *principal).await?;
    if !authz::can_delete_team(&scope) {
        return Err(AppError::forbidden("only HEAD may delete teams"));
    }

    let affected = sqlx::query("DELETE FROM teams WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("team not found"));
    }

    Ok(())
}

pub async fn add_member(
    pool: &SqlitePool,
    principal: &Principal,
    team_id: Uuid,
    payload: TeamMemberAddRequest,
) -> AppResult<TeamMember> {
    let team = fetch_team(pool, team_id).await?;
    let scope = Scope::load(pool, *principal).await?;
    let team_ref = TeamRef {
        id: team.id,
        leader_id: team.leader_id,
    };
    if !authz::can_update_team(&scope, &team_ref, false) {
        return Err(AppError::forbidden("not allowed to manage team members"));
    }

    let user = Directory::new(pool)
        .find_user(payload.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    let mut tx = pool.begin().await?;
    upsert_member(&mut tx, team_id, user.id).await?;
    tx.commit().await?;

    let member = sqlx::query_as::<_, TeamMember>(
        "SELECT tm.id, tm.team_id, tm.user_id, u.name AS user_name, tm.joined_at \
         FROM team_members tm INNER JOIN users u ON u.id = tm.user_id \
         WHERE tm.team_id = ? AND tm.user_id = ?",
    )
    .bind(team_id)
    .bind(user.id)
    .fetch_one(pool)
    .await?;

    Ok(member)
}

pub async fn remove_member(
    pool: &SqlitePool,
    principal: &Principal,
    team_id: Uuid,
    user_id: Uuid,
) -> AppResult<()> {
    let team = fetch_team(pool, team_id).await?;
    let scope = Scope::load(pool, *principal).await?;
    let team_ref = TeamRef {
        id: team.id,
        leader_id: team.leader_id,
    };
    if !authz::can_update_team(&scope, &team_ref, false) {
        return Err(AppError::forbidden("not allowed to manage team members"));
    }

    // The leader stays a member until leadership is reassigned.
    if team.leader_id == Some(user_id) {
        return Err(AppError::bad_request(
            "cannot remove the team leader; assign a new leader first",
        ));
    }

    let affected = sqlx::query("DELETE FROM team_members WHERE team_id = ? AND user_id = ?")
        .bind(team_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("team member not found"));
    }

    Ok(())
}

async fn fetch_team(pool: &SqlitePool, id: Uuid) -> AppResult<DbTeam> {
    sqlx::query_as::<_, DbTeam>(&format!("SELECT {} FROM teams WHERE id = ?", TEAM_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("team not found"))
}

async fn fetch_members(pool: &SqlitePool, team_id: Uuid) -> AppResult<Vec<TeamMember>> {
    let members = sqlx::query_as::<_, TeamMember>(
        "SELECT tm.id, tm.team_id, tm.user_id, u.name AS user_name, tm.joined_at \
         FROM team_members tm INNER JOIN users u ON u.id = tm.user_id \
         WHERE tm.team_id = ? ORDER BY tm.joined_at ASC",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;

    Ok(members)
}

/// Idempotent membership insert on the (user_id, team_id) unique key.
async fn upsert_member(
    tx: &mut Transaction<'_, Sqlite>,
    team_id: Uuid,
    user_id: Uuid,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO team_members (id, team_id, user_id, joined_at) VALUES (?, ?, ?, ?) \
         ON CONFLICT(user_id, team_id) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(team_id)
    .bind(user_id)
    .bind(utc_now())
    .execute(&mut **tx)
    .await?;

    Ok(())
}
