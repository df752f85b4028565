use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::AppResult;
use crate::models::issue::{Issue, IssueCreateRequest, IssueUpdateRequest};
use crate::services;
use crate::services::issues::IssueFilters;

#[utoipa::path(
    get,
    path = "/issues",
    tag = "Issues",
    params(IssueFilters),
    responses((status = 200, description = "List visible issues", body = [Issue]))
)]
pub async fn list_issues(
    State(state): State<AppState>,
    principal: Principal,
    Query(filters): Query<IssueFilters>,
) -> AppResult<Json<Vec<Issue>>> {
    let issues = services::issues::list(&state.pool, &principal, filters).await?;
    Ok(Json(issues))
}

#[utoipa::path(
    post,
    path = "/issues",
    tag = "Issues",
    request_body = IssueCreateRequest,
    responses((status = 201, description = "Issue created", body = Issue))
)]
pub async fn create_issue(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<IssueCreateRequest>,
) -> AppResult<(StatusCode, Json<Issue>)> {
    let issue = services::issues::create(&state.pool, &principal, payload).await?;
    Ok((StatusCode::CREATED, Json(issue)))
}

#[utoipa::path(
    get,
    path = "/issues/{id}",
    tag = "Issues",
    params(("id" = Uuid, Path, description = "Issue id")),
    responses((status = 200, description = "Issue detail", body = Issue))
)]
pub async fn get_issue(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Issue>> {
    let issue = services::issues::get(&state.pool, &principal, id).await?;
    Ok(Json(issue))
}

#[utoipa::path(
    put,
    path = "/issues/{id}",
    tag = "Issues",
    params(("id" = Uuid, Path, description = "Issue id")),
    request_body = IssueUpdateRequest,
    responses(
        (status = 200, description = "Issue updated", body = Issue),
        (status = 403, description = "Non-creator may only change status")
    )
)]
pub async fn update_issue(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<IssueUpdateRequest>,
) -> AppResult<Json<Issue>> {
    let issue = services::issues::update(&state.pool, &principal, id, payload).await?;
    Ok(Json(issue))
}

#[utoipa::path(
    delete,
    path = "/issues/{id}",
    tag = "Issues",
    params(("id" = Uuid, Path, description = "Issue id")),
    responses((status = 204, description = "Issue deleted"))
)]
pub async fn delete_issue(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::issues::delete(&state.pool, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
