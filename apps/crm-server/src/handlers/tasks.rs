use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;

use crm_db::models::task::Task;

use crate::AppState;
use crate::auth::OrgContext;
use crate::error::ApiError;
use crate::services::task_service::{TaskDraft, TaskListParams};

pub async fn list_tasks(
    State(state): State<AppState>,
    ctx: OrgContext,
    Query(query): Query<TaskListParams>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.tasks.list(ctx.org.id, &query).await?;
    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<AppState>,
    ctx: OrgContext,
    Json(payload): Json<TaskDraft>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state.tasks.create(ctx.user.id, ctx.org.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}
