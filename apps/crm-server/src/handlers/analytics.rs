use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::auth::OrgContext;
use crate::error::ApiError;
use crate::services::analytics_service::{DealsSummary, FunnelEntry};

pub async fn deals_summary(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> Result<Json<DealsSummary>, ApiError> {
    let summary = state.analytics.deals_summary(ctx.org.id).await?;
    Ok(Json(summary))
}

pub async fn deals_funnel(
    State(state): State<AppState>,
    ctx: OrgContext,
) -> Result<Json<Vec<FunnelEntry>>, ApiError> {
    let funnel = state.analytics.deals_funnel(ctx.org.id).await?;
    Ok(Json(funnel))
}
