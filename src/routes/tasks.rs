use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::AppResult;
use crate::models::task::{Task, TaskCreateRequest, TaskUpdateRequest};
use crate::services;
use crate::services::tasks::TaskFilters;

#[utoipa::path(
    get,
    path = "/tasks",
    tag = "Tasks",
    params(TaskFilters),
    responses(
        (status = 200, description = "List visible tasks", body = [Task]),
        (status = 403, description = "user_id filter outside the viewer's reach")
    )
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    principal: Principal,
    Query(filters): Query<TaskFilters>,
) -> AppResult<Json<Vec<Task>>> {
    let tasks = services::tasks::list(&state.pool, &principal, filters).await?;
    Ok(Json(tasks))
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = "Tasks",
    request_body = TaskCreateRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 403, description = "EMPLOYEE may not create tasks")
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<TaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let task = services::tasks::create(&state.pool, &principal, payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses((status = 200, description = "Task detail", body = Task))
)]
pub async fn get_task(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Task>> {
    let task = services::tasks::get(&state.pool, &principal, id).await?;
    Ok(Json(task))
}

#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = TaskUpdateRequest,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 403, description = "Patch touches fields outside the caller's rights")
    )
)]
pub async fn update_task(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    let task = services::tasks::update(&state.pool, &principal, id, payload).await?;
    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses((status = 204, description = "Task deleted with its team links and updates"))
)]
pub async fn delete_task(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::tasks::delete(&state.pool, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
