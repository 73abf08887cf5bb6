use anyhow::{Context, Result};
use sqlx::{PgConnection, PgPool};

use crate::models::activity::Activity;

/// Append-only writer for the deal audit trail. `kind` is a free-form
/// tag and is deliberately not validated here.
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Takes the caller's connection so the append commits (or rolls
    /// back) together with the deal mutation that caused it.
    pub async fn record(
        &self,
        conn: &mut PgConnection,
        deal_id: i64,
        author_id: Option<i64>,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<Activity> {
        let activity = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activities (deal_id, author_id, type, payload)
            VALUES ($1, $2, $3, $4)
            RETURNING id, deal_id, author_id, type as "kind", payload, created_at
            "#,
        )
        .bind(deal_id)
        .bind(author_id)
        .bind(kind)
        .bind(payload)
        .fetch_one(conn)
        .await
        .context("Failed to record activity")?;
        Ok(activity)
    }

    pub async fn list_by_deal(&self, deal_id: i64) -> Result<Vec<Activity>> {
        let activities = sqlx::query_as::<_, Activity>(
            r#"
            SELECT id, deal_id, author_id, type as "kind", payload, created_at
            FROM activities
            WHERE deal_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(deal_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list activities for deal")?;
        Ok(activities)
    }
}
