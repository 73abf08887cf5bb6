use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};

use crate::models::task::Task;

#[derive(Debug, Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        conn: &mut PgConnection,
        deal_id: i64,
        title: &str,
        description: Option<&str>,
        due_date: Option<NaiveDate>,
    ) -> Result<Task> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (deal_id, title, description, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, deal_id, title, description, due_date, is_done, created_at
            "#,
        )
        .bind(deal_id)
        .bind(title)
        .bind(description)
        .bind(due_date)
        .fetch_one(conn)
        .await
        .context("Failed to create task")?;
        Ok(task)
    }

    /// Tasks have no organization column of their own; org scoping goes
    /// through the owning deal.
    pub async fn list_by_org(
        &self,
        org_id: i64,
        deal_id: Option<i64>,
        only_open: bool,
        due_before: Option<NaiveDate>,
        due_after: Option<NaiveDate>,
    ) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.deal_id, t.title, t.description, t.due_date, t.is_done, t.created_at
            FROM tasks t
            JOIN deals d ON d.id = t.deal_id
            WHERE d.organization_id = $1
              AND ($2::bigint IS NULL OR t.deal_id = $2)
              AND (NOT $3::boolean OR t.is_done = FALSE)
              AND ($4::date IS NULL OR t.due_date <= $4)
              AND ($5::date IS NULL OR t.due_date >= $5)
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(org_id)
        .bind(deal_id)
        .bind(only_open)
        .bind(due_before)
        .bind(due_after)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list tasks")?;
        Ok(tasks)
    }
}
