use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crm_db::models::deal::{Deal, DealStage, DealStatus};
use crm_db::repositories::deal_repo::{DealFilter, DealOrderBy};

use crate::AppState;
use crate::auth::OrgContext;
use crate::error::ApiError;
use crate::handlers::PageParams;
use crate::services::deal_service::{DealDraft, DealPatch};

#[derive(Debug, Deserialize)]
pub struct DealListQuery {
    #[serde(default = "super::default_page")]
    pub page: i64,
    #[serde(default = "super::default_page_size")]
    pub page_size: i64,
    /// Comma-separated status list, e.g. `new,in_progress`.
    pub status: Option<String>,
    pub stage: Option<String>,
    pub min_amount_cents: Option<i64>,
    pub max_amount_cents: Option<i64>,
    pub owner_id: Option<i64>,
    pub order_by: Option<String>,
    pub order: Option<String>,
}

impl DealListQuery {
    fn window(&self) -> PageParams {
        PageParams::new(self.page, self.page_size)
    }
}

#[derive(Debug, Serialize)]
pub struct DealListResponse {
    pub items: Vec<Deal>,
    pub total: usize,
}

fn parse_order_by(raw: Option<&str>) -> Result<DealOrderBy, ApiError> {
    match raw.unwrap_or("created_at") {
        "created_at" => Ok(DealOrderBy::CreatedAt),
        "updated_at" => Ok(DealOrderBy::UpdatedAt),
        "amount_cents" => Ok(DealOrderBy::AmountCents),
        "title" => Ok(DealOrderBy::Title),
        other => Err(ApiError::InvalidArgument(format!(
            "unsupported order_by column: {other}"
        ))),
    }
}

fn parse_filter(query: &DealListQuery) -> Result<DealFilter, ApiError> {
    let status = match &query.status {
        None => None,
        Some(raw) => {
            let mut parsed = Vec::new();
            for part in raw.split(',').filter(|s| !s.is_empty()) {
                let status = part
                    .parse::<DealStatus>()
                    .map_err(|e| ApiError::InvalidArgument(e.to_string()))?;
                parsed.push(status);
            }
            Some(parsed)
        }
    };
    let stage = query
        .stage
        .as_deref()
        .map(|s| s.parse::<DealStage>())
        .transpose()
        .map_err(|e| ApiError::InvalidArgument(e.to_string()))?;

    Ok(DealFilter {
        status,
        stage,
        min_amount_cents: query.min_amount_cents,
        max_amount_cents: query.max_amount_cents,
        owner_id: query.owner_id,
    })
}

pub async fn list_deals(
    State(state): State<AppState>,
    ctx: OrgContext,
    Query(query): Query<DealListQuery>,
) -> Result<Json<DealListResponse>, ApiError> {
    let filter = parse_filter(&query)?;
    let order_by = parse_order_by(query.order_by.as_deref())?;
    let descending = !matches!(query.order.as_deref(), Some("asc"));
    let window = query.window();

    let items = state
        .deals
        .list(
            ctx.org.id,
            &filter,
            order_by,
            descending,
            window.offset(),
            window.limit(),
        )
        .await?;
    let total = items.len();
    Ok(Json(DealListResponse { items, total }))
}

pub async fn create_deal(
    State(state): State<AppState>,
    ctx: OrgContext,
    Json(payload): Json<DealDraft>,
) -> Result<(StatusCode, Json<Deal>), ApiError> {
    let deal = state.deals.create(ctx.org.id, ctx.user.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(deal)))
}

pub async fn get_deal(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(deal_id): Path<i64>,
) -> Result<Json<Deal>, ApiError> {
    let deal = state.deals.get_in_org(ctx.org.id, deal_id).await?;
    Ok(Json(deal))
}

pub async fn patch_deal(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(deal_id): Path<i64>,
    Json(payload): Json<DealPatch>,
) -> Result<Json<Deal>, ApiError> {
    let deal = state.deals.get_in_org(ctx.org.id, deal_id).await?;
    let updated = state
        .deals
        .patch(&ctx.user, &ctx.membership, deal, &payload)
        .await?;
    Ok(Json(updated))
}

pub async fn delete_deal(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(deal_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let deal = state.deals.get_in_org(ctx.org.id, deal_id).await?;
    state.deals.delete(&ctx.user, &ctx.membership, &deal).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;

    fn parse(uri: &str) -> DealListQuery {
        let uri: Uri = uri.parse().unwrap();
        let Query(query) = Query::try_from_uri(&uri).unwrap();
        query
    }

    #[test]
    fn pagination_fields_parse_from_the_query_string() {
        let query = parse("/api/v1/deals?page=2&page_size=10&owner_id=5");
        assert_eq!(query.page, 2);
        assert_eq!(query.page_size, 10);
        assert_eq!(query.owner_id, Some(5));

        let window = query.window();
        assert_eq!(window.offset(), 10);
        assert_eq!(window.limit(), 10);
    }

    #[test]
    fn omitted_pagination_falls_back_to_defaults() {
        let query = parse("/api/v1/deals?status=new,in_progress&order=asc");
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 20);

        let filter = parse_filter(&query).unwrap();
        assert_eq!(
            filter.status,
            Some(vec![DealStatus::New, DealStatus::InProgress])
        );
    }

    #[test]
    fn unknown_order_by_columns_are_rejected() {
        assert!(parse_order_by(Some("owner_id; DROP TABLE deals")).is_err());
        assert_eq!(parse_order_by(None).unwrap(), DealOrderBy::CreatedAt);
    }
}
