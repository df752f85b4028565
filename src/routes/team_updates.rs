use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::AppResult;
use crate::models::team_update::{TeamUpdate, TeamUpdateCreateRequest, TeamUpdateEditRequest};
use crate::services;
use crate::services::team_updates::TeamUpdateFilters;

#[utoipa::path(
    get,
    path = "/team-updates",
    tag = "TeamUpdates",
    params(TeamUpdateFilters),
    responses((status = 200, description = "List visible team updates", body = [TeamUpdate]))
)]
pub async fn list_team_updates(
    State(state): State<AppState>,
    principal: Principal,
    Query(filters): Query<TeamUpdateFilters>,
) -> AppResult<Json<Vec<TeamUpdate>>> {
    let updates = services::team_updates::list(&state.pool, &principal, filters).await?;
    Ok(Json(updates))
}

#[utoipa::path(
    post,
    path = "/team-updates",
    tag = "TeamUpdates",
    request_body = TeamUpdateCreateRequest,
    responses(
        (status = 201, description = "Update posted", body = TeamUpdate),
        (status = 400, description = "team_task_id belongs to another team"),
        (status = 403, description = "Caller is not a member of the team")
    )
)]
pub async fn create_team_update(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<TeamUpdateCreateRequest>,
) -> AppResult<(StatusCode, Json<TeamUpdate>)> {
    let update = services::team_updates::create(&state.pool, &principal, payload).await?;
    Ok((StatusCode::CREATED, Json(update)))
}

#[utoipa::path(
    get,
    path = "/team-updates/{id}",
    tag = "TeamUpdates",
    params(("id" = Uuid, Path, description = "Team update id")),
    responses((status = 200, description = "Team update detail", body = TeamUpdate))
)]
pub async fn get_team_update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TeamUpdate>> {
    let update = services::team_updates::get(&state.pool, &principal, id).await?;
    Ok(Json(update))
}

#[utoipa::path(
    put,
    path = "/team-updates/{id}",
    tag = "TeamUpdates",
    params(("id" = Uuid, Path, description = "Team update id")),
    request_body = TeamUpdateEditRequest,
    responses(
        (status = 200, description = "Content edited", body = TeamUpdate),
        (status = 403, description = "Only the author may edit")
    )
)]
pub async fn update_team_update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<TeamUpdateEditRequest>,
) -> AppResult<Json<TeamUpdate>> {
    let update = services::team_updates::update(&state.pool, &principal, id, payload).await?;
    Ok(Json(update))
}

#[utoipa::path(
    delete,
    path = "/team-updates/{id}",
    tag = "TeamUpdates",
    params(("id" = Uuid, Path, description = "Team update id")),
    responses((status = 204, description = "Update deleted"))
)]
pub async fn delete_team_update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::team_updates::delete(&state.pool, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
