use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use crate::models::deal::{Deal, DealStage, DealStatus};

/// Sortable columns for deal listings. A closed set so user input never
/// reaches the ORDER BY clause directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealOrderBy {
    CreatedAt,
    UpdatedAt,
    AmountCents,
    Title,
}

impl DealOrderBy {
    fn column(self) -> &'static str {
        match self {
            DealOrderBy::CreatedAt => "created_at",
            DealOrderBy::UpdatedAt => "updated_at",
            DealOrderBy::AmountCents => "amount_cents",
            DealOrderBy::Title => "title",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DealFilter {
    pub status: Option<Vec<DealStatus>>,
    pub stage: Option<DealStage>,
    pub min_amount_cents: Option<i64>,
    pub max_amount_cents: Option<i64>,
    pub owner_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct DealRepository {
    pool: PgPool,
}

impl DealRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_deal(row: &PgRow) -> Result<Deal> {
        let status: String = row.try_get("status")?;
        let stage: String = row.try_get("stage")?;
        Ok(Deal {
            id: row.try_get("id")?,
            organization_id: row.try_get("organization_id")?,
            contact_id: row.try_get("contact_id")?,
            owner_id: row.try_get("owner_id")?,
            title: row.try_get("title")?,
            amount_cents: row.try_get("amount_cents")?,
            currency: row.try_get("currency")?,
            status: status
                .parse::<DealStatus>()
                .context("Stored deal has an unknown status")?,
            stage: stage
                .parse::<DealStage>()
                .context("Stored deal has an unknown stage")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Deal>> {
        let row = sqlx::query("SELECT * FROM deals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch deal by ID")?;
        row.map(|r| Self::row_to_deal(&r)).transpose()
    }

    pub async fn list_by_org(
        &self,
        org_id: i64,
        filter: &DealFilter,
        order_by: DealOrderBy,
        descending: bool,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Deal>> {
        let direction = if descending { "DESC" } else { "ASC" };
        let sql = format!(
            r#"
            SELECT * FROM deals
            WHERE organization_id = $1
              AND ($2::text[] IS NULL OR status = ANY($2))
              AND ($3::text IS NULL OR stage = $3)
              AND ($4::bigint IS NULL OR amount_cents >= $4)
              AND ($5::bigint IS NULL OR amount_cents <= $5)
              AND ($6::bigint IS NULL OR owner_id = $6)
            ORDER BY {} {}
            OFFSET $7 LIMIT $8
            "#,
            order_by.column(),
            direction
        );

        let status: Option<Vec<String>> = filter
            .status
            .as_ref()
            .map(|s| s.iter().map(|v| v.as_str().to_string()).collect());

        let rows = sqlx::query(&sql)
            .bind(org_id)
            .bind(status)
            .bind(filter.stage.map(|s| s.as_str()))
            .bind(filter.min_amount_cents)
            .bind(filter.max_amount_cents)
            .bind(filter.owner_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list deals")?;

        rows.iter().map(Self::row_to_deal).collect()
    }

    pub async fn has_deals_for_contact(
        &self,
        conn: &mut PgConnection,
        contact_id: i64,
    ) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM deals WHERE contact_id = $1)")
                .bind(contact_id)
                .fetch_one(conn)
                .await
                .context("Failed to check deals for contact")?;
        Ok(exists)
    }

    pub async fn create(
        &self,
        conn: &mut PgConnection,
        org_id: i64,
        contact_id: i64,
        owner_id: i64,
        title: &str,
        amount_cents: i64,
        currency: &str,
    ) -> Result<Deal> {
        let row = sqlx::query(
            r#"
            INSERT INTO deals (organization_id, contact_id, owner_id, title, amount_cents, currency, status, stage)
            VALUES ($1, $2, $3, $4, $5, $6, 'new', 'qualification')
            RETURNING *
            "#,
        )
        .bind(org_id)
        .bind(contact_id)
        .bind(owner_id)
        .bind(title)
        .bind(amount_cents)
        .bind(currency)
        .fetch_one(conn)
        .await
        .context("Failed to create deal")?;
        Self::row_to_deal(&row)
    }

    /// Persists every mutable field and refreshes `updated_at`.
    /// `organization_id`, `contact_id` and `owner_id` are immutable.
    pub async fn update(&self, conn: &mut PgConnection, deal: &Deal) -> Result<Deal> {
        let row = sqlx::query(
            r#"
            UPDATE deals
            SET title = $1, amount_cents = $2, status = $3, stage = $4, updated_at = now()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(&deal.title)
        .bind(deal.amount_cents)
        .bind(deal.status.as_str())
        .bind(deal.stage.as_str())
        .bind(deal.id)
        .fetch_one(conn)
        .await
        .context("Failed to update deal")?;
        Self::row_to_deal(&row)
    }

    pub async fn delete(&self, conn: &mut PgConnection, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM deals WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .context("Failed to delete deal")?;
        Ok(())
    }
}
