use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{PgPool, Row};

use crm_db::models::deal::DealStage;

#[derive(Debug, Clone, Serialize)]
pub struct DealsSummary {
    pub total_deals: i64,
    pub total_amount_cents: i64,
    pub won: i64,
    pub lost: i64,
    pub in_progress: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunnelEntry {
    pub stage: String,
    pub count: i64,
}

/// Trivial passthrough aggregation over deals; nothing here mutates.
#[derive(Clone)]
pub struct AnalyticsService {
    pool: PgPool,
}

impl AnalyticsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn deals_summary(&self, org_id: i64) -> Result<DealsSummary> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_deals,
                COALESCE(SUM(amount_cents), 0)::bigint AS total_amount_cents,
                COUNT(*) FILTER (WHERE status = 'won') AS won,
                COUNT(*) FILTER (WHERE status = 'lost') AS lost,
                COUNT(*) FILTER (WHERE status = 'in_progress') AS in_progress
            FROM deals
            WHERE organization_id = $1
            "#,
        )
        .bind(org_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to aggregate deals summary")?;

        Ok(DealsSummary {
            total_deals: row.try_get("total_deals")?,
            total_amount_cents: row.try_get("total_amount_cents")?,
            won: row.try_get("won")?,
            lost: row.try_get("lost")?,
            in_progress: row.try_get("in_progress")?,
        })
    }

    /// Counts per stage, in pipeline order; stages with no deals are
    /// reported with a zero count.
    pub async fn deals_funnel(&self, org_id: i64) -> Result<Vec<FunnelEntry>> {
        let rows = sqlx::query(
            "SELECT stage, COUNT(*) AS count FROM deals WHERE organization_id = $1 GROUP BY stage",
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to aggregate deals funnel")?;

        let mut counts: Vec<(String, i64)> = Vec::with_capacity(rows.len());
        for row in &rows {
            counts.push((row.try_get("stage")?, row.try_get("count")?));
        }

        let funnel = DealStage::PIPELINE
            .iter()
            .map(|stage| {
                let count = counts
                    .iter()
                    .find(|(name, _)| name == stage.as_str())
                    .map(|(_, c)| *c)
                    .unwrap_or(0);
                FunnelEntry {
                    stage: stage.as_str().to_string(),
                    count,
                }
            })
            .collect();
        Ok(funnel)
    }
}
