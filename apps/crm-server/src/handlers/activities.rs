use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crm_db::models::activity::Activity;

use crate::AppState;
use crate::auth::OrgContext;
use crate::error::ApiError;
use crate::services::activity_service::ActivityDraft;

pub async fn list_activities(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(deal_id): Path<i64>,
) -> Result<Json<Vec<Activity>>, ApiError> {
    let activities = state.activities.list(ctx.org.id, deal_id).await?;
    Ok(Json(activities))
}

pub async fn create_activity(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(deal_id): Path<i64>,
    Json(payload): Json<ActivityDraft>,
) -> Result<(StatusCode, Json<Activity>), ApiError> {
    let activity = state
        .activities
        .create(&ctx.user, &ctx.membership, deal_id, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(activity)))
}
