use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Issue {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub creator_id: Uuid,
    pub task_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbIssue {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub creator_id: Uuid,
    pub task_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbIssue> for Issue {
    fn from(value: DbIssue) -> Self {
        Issue {
            id: value.id,
            title: value.title,
            description: value.description,
            status: value.status,
            creator_id: value.creator_id,
            task_id: value.task_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueCreateRequest {
    #[schema(example = "Staging deploy fails")]
    pub title: String,
    #[schema(example = "Pipeline step `deploy` exits with code 1 since this morning.")]
    pub description: String,
    /// Optional link to the task the issue was found in.
    pub task_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IssueStatus>,
    pub task_id: Option<Uuid>,
}

impl IssueUpdateRequest {
    /// Anything beyond a status transition is creator-only.
    pub fn touches_non_status(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.task_id.is_some()
    }
}
