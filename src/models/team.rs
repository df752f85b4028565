use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub leader_id: Option<Uuid>,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTeam {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub leader_id: Option<Uuid>,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbTeam> for Team {
    fn from(value: DbTeam) -> Self {
        Team {
            id: value.id,
            name: value.name,
            description: value.description,
            leader_id: value.leader_id,
            creator_id: value.creator_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Detail view joining the attached projects and the member roster.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamDetail {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub leader_id: Option<Uuid>,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub project_ids: Vec<Uuid>,
    pub members: Vec<TeamMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TeamMember {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    /// Joined from `users.name` for display; never includes credentials.
    pub user_name: Option<String>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamCreateRequest {
    #[schema(example = "Launch Crew")]
    pub name: String,
    #[schema(example = "Cross-functional team for the Q4 launch.")]
    pub description: Option<String>,
    pub leader_id: Uuid,
    /// At least one project must be attached.
    pub project_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Leader reassignment; HEAD only.
    pub leader_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamMemberAddRequest {
    pub user_id: Uuid,
}
