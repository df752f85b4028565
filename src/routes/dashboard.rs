use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::AppResult;
use crate::models::issue::Issue;
use crate::models::task::Task;
use crate::services;

/// Snapshot of a user's open workload: their active tasks plus the
/// unresolved issues they have reported.
#[derive(Debug, Serialize, ToSchema)]
pub struct Dashboard {
    pub user_id: Uuid,
    pub active_tasks: Vec<Task>,
    pub open_issues: Vec<Issue>,
}

#[utoipa::path(
    get,
    path = "/dashboard/{user_id}",
    tag = "Dashboard",
    params(("user_id" = Uuid, Path, description = "User whose workload to inspect")),
    responses(
        (status = 200, description = "Active tasks and open issues for the user", body = Dashboard),
        (status = 403, description = "Caller may not inspect this user's workload")
    )
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
    principal: Principal,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Dashboard>> {
    // The workload check inside the task lookup covers the issue list too,
    // so issues are only fetched once the caller has passed it.
    let active_tasks = services::tasks::active_for_user(&state.pool, &principal, user_id).await?;
    let open_issues = services::issues::active_for_user(&state.pool, user_id).await?;

    Ok(Json(Dashboard {
        user_id,
        active_tasks,
        open_issues,
    }))
}
