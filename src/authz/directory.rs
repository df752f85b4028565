use sqlx::SqlitePool;
use uuid::Uuid;

use super::{Principal, Role};
use crate::errors::AppResult;

/// Read-only directory lookups backing the authorization layer: who manages
/// whom, who leads which team, who is a member of what.
pub struct Directory<'a> {
    pool: &'a SqlitePool,
}

/// Minimal user projection the authorization layer needs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DirectoryUser {
    pub id: Uuid,
    pub role: Role,
    pub manager_id: Option<Uuid>,
}

impl<'a> Directory<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_user(&self, id: Uuid) -> AppResult<Option<DirectoryUser>> {
        let user = sqlx::query_as::<_, DirectoryUser>(
            "SELECT id, role, manager_id FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn employee_ids(&self, manager_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE manager_id = ?")
            .bind(manager_id)
            .fetch_all(self.pool)
            .await?;

        Ok(ids)
    }

    pub async fn team_ids_led_by(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM teams WHERE leader_id = ?")
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;

        Ok(ids)
    }

    pub async fn team_ids_joined_by(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids =
            sqlx::query_scalar::<_, Uuid>("SELECT team_id FROM team_members WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(self.pool)
                .await?;

        Ok(ids)
    }

    pub async fn is_team_member(&self, user_id: Uuid, team_id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM team_members WHERE user_id = ? AND team_id = ?)",
        )
        .bind(user_id)
        .bind(team_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn is_team_leader(&self, user_id: Uuid, team_id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM teams WHERE id = ? AND leader_id = ?)",
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn is_manager_of(&self, manager_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ? AND manager_id = ?)",
        )
        .bind(user_id)
        .bind(manager_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Teams a task has been assigned to via `team_tasks`.
    pub async fn task_team_ids(&self, task_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids =
            sqlx::query_scalar::<_, Uuid>("SELECT team_id FROM team_tasks WHERE task_id = ?")
                .bind(task_id)
                .fetch_all(self.pool)
                .await?;

        Ok(ids)
    }

    /// Whether the user belongs to any team attached to the project.
    pub async fn is_member_of_project_team(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM team_members tm
                INNER JOIN team_projects tp ON tp.team_id = tm.team_id
                WHERE tm.user_id = ? AND tp.project_id = ?
            )",
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}

/// Per-request snapshot of the principal's directory relationships.
///
/// Loaded once per request so the rule functions and visibility filters stay
/// pure and no per-record directory queries happen during list evaluation.
#[derive(Debug, Clone)]
pub struct Scope {
    pub principal: Principal,
    /// Direct reports. Only populated for MANAGER.
    pub employee_ids: Vec<Uuid>,
    /// Teams the principal leads.
    pub led_team_ids: Vec<Uuid>,
    /// Teams the principal is a member of.
    pub member_team_ids: Vec<Uuid>,
}

impl Scope {
    pub async fn load(pool: &SqlitePool, principal: Principal) -> AppResult<Self> {
        let directory = Directory::new(pool);

        // HEAD is unrestricted; skip the relationship queries entirely.
        if principal.role.is_head() {
            return Ok(Self {
                principal,
                employee_ids: Vec::new(),
                led_team_ids: Vec::new(),
                member_team_ids: Vec::new(),
            });
        }

        let employee_ids = if principal.role.is_manager() {
            directory.employee_ids(principal.id).await?
        } else {
            Vec::new()
        };
        let led_team_ids = directory.team_ids_led_by(principal.id).await?;
        let member_team_ids = directory.team_ids_joined_by(principal.id).await?;

        Ok(Self {
            principal,
            employee_ids,
            led_team_ids,
            member_team_ids,
        })
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn user_id(&self) -> Uuid {
        self.principal.id
    }

    pub fn manages(&self, user_id: Uuid) -> bool {
        self.employee_ids.contains(&user_id)
    }

    pub fn leads(&self, team_id: Uuid) -> bool {
        self.led_team_ids.contains(&team_id)
    }

    pub fn member_of(&self, team_id: Uuid) -> bool {
        self.member_team_ids.contains(&team_id)
    }
}
