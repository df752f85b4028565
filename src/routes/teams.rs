use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::AppResult;
use crate::models::team::{
    Team, TeamCreateRequest, TeamDetail, TeamMember, TeamMemberAddRequest, TeamUpdateRequest,
};
use crate::services;

#[utoipa::path(
    get,
    path = "/teams",
    tag = "Teams",
    responses((status = 200, description = "List visible teams", body = [Team]))
)]
pub async fn list_teams(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<Json<Vec<Team>>> {
    let teams = services::teams::list(&state.pool, &principal).await?;
    Ok(Json(teams))
}

#[utoipa::path(
    post,
    path = "/teams",
    tag = "Teams",
    request_body = TeamCreateRequest,
    responses(
        (status = 201, description = "Team created", body = TeamDetail),
        (status = 400, description = "No projects attached or invalid leader"),
        (status = 403, description = "Only HEAD may create teams")
    )
)]
pub async fn create_team(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<TeamCreateRequest>,
) -> AppResult<(StatusCode, Json<TeamDetail>)> {
    let team = services::teams::create(&state.pool, &principal, payload).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

#[utoipa::path(
    get,
    path = "/teams/{id}",
    tag = "Teams",
    params(("id" = Uuid, Path, description = "Team id")),
    responses((status = 200, description = "Team detail with projects and members", body = TeamDetail))
)]
pub async fn get_team(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TeamDetail>> {
    let team = services::teams::get(&state.pool, &principal, id).await?;
    Ok(Json(team))
}

#[utoipa::path(
    put,
    path = "/teams/{id}",
    tag = "Teams",
    params(("id" = Uuid, Path, description = "Team id")),
    request_body = TeamUpdateRequest,
    responses(
        (status = 200, description = "Team updated", body = TeamDetail),
        (status = 403, description = "Leader reassignment requires HEAD")
    )
)]
pub async fn update_team(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<TeamUpdateRequest>,
) -> AppResult<Json<TeamDetail>> {
    let team = services::teams::update(&state.pool, &principal, id, payload).await?;
    Ok(Json(team))
}

#[utoipa::path(
    delete,
    path = "/teams/{id}",
    tag = "Teams",
    params(("id" = Uuid, Path, description = "Team id")),
    responses((status = 204, description = "Team deleted"))
)]
pub async fn delete_team(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::teams::delete(&state.pool, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/teams/{id}/members",
    tag = "Teams",
    params(("id" = Uuid, Path, description = "Team id")),
    request_body = TeamMemberAddRequest,
    responses((status = 201, description = "Member added (idempotent)", body = TeamMember))
)]
pub async fn add_member(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<TeamMemberAddRequest>,
) -> AppResult<(StatusCode, Json<TeamMember>)> {
    let member = services::teams::add_member(&state.pool, &principal, id, payload).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    delete,
    path = "/teams/{id}/members/{user_id}",
    tag = "Teams",
    params(
        ("id" = Uuid, Path, description = "Team id"),
        ("user_id" = Uuid, Path, description = "Member's user id")
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 400, description = "Cannot remove the current leader")
    )
)]
pub async fn remove_member(
    State(state): State<AppState>,
    principal: Principal,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    services::teams::remove_member(&state.pool, &principal, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
