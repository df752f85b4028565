use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamUpdate {
    pub id: Uuid,
    pub content: String,
    pub member_id: Uuid,
    pub team_id: Uuid,
    pub task_id: Option<Uuid>,
    /// Resolved through `team_members` for response shaping.
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTeamUpdate {
    pub id: Uuid,
    pub content: String,
    pub member_id: Uuid,
    pub team_id: Uuid,
    pub task_id: Option<Uuid>,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<DbTeamUpdate> for TeamUpdate {
    fn from(value: DbTeamUpdate) -> Self {
        TeamUpdate {
            id: value.id,
            content: value.content,
            member_id: value.member_id,
            team_id: value.team_id,
            task_id: value.task_id,
            author_id: value.author_id,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamUpdateCreateRequest {
    #[schema(example = "Sprint goal reached; demo scheduled for Friday.")]
    pub content: String,
    pub team_id: Uuid,
    /// Optional link to a TeamTask; must belong to `team_id`.
    pub team_task_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamUpdateEditRequest {
    pub content: String,
}
