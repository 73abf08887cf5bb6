use anyhow::Context;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crm_db::models::task::Task;
use crm_db::repositories::activity_repo::ActivityRepository;
use crm_db::repositories::deal_repo::DealRepository;
use crm_db::repositories::task_repo::TaskRepository;

use crate::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
pub struct TaskDraft {
    pub deal_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskListParams {
    pub deal_id: Option<i64>,
    pub only_open: Option<bool>,
    pub due_before: Option<NaiveDate>,
    pub due_after: Option<NaiveDate>,
}

/// Pure rule so it can be pinned in tests: a due date, when present,
/// must not be in the past at creation time.
pub fn validate_due_date(due_date: Option<NaiveDate>, today: NaiveDate) -> Result<(), ApiError> {
    match due_date {
        Some(due) if due < today => Err(ApiError::InvalidArgument(
            "due_date cannot be in the past".to_string(),
        )),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct TaskService {
    pool: PgPool,
    tasks: TaskRepository,
    deals: DealRepository,
    activities: ActivityRepository,
}

impl TaskService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tasks: TaskRepository::new(pool.clone()),
            deals: DealRepository::new(pool.clone()),
            activities: ActivityRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn create(
        &self,
        actor_id: i64,
        org_id: i64,
        draft: &TaskDraft,
    ) -> Result<Task, ApiError> {
        validate_due_date(draft.due_date, Utc::now().date_naive())?;

        let deal = self.deals.get_by_id(draft.deal_id).await?;
        let deal = match deal {
            Some(d) if d.organization_id == org_id => d,
            _ => return Err(ApiError::NotFound("deal not found".to_string())),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        let task = self
            .tasks
            .create(
                &mut tx,
                deal.id,
                &draft.title,
                draft.description.as_deref(),
                draft.due_date,
            )
            .await?;
        self.activities
            .record(
                &mut tx,
                deal.id,
                Some(actor_id),
                "task_created",
                json!({ "task_id": task.id, "title": task.title }),
            )
            .await?;
        tx.commit().await.context("Failed to commit transaction")?;
        Ok(task)
    }

    pub async fn list(&self, org_id: i64, params: &TaskListParams) -> Result<Vec<Task>, ApiError> {
        let tasks = self
            .tasks
            .list_by_org(
                org_id,
                params.deal_id,
                params.only_open.unwrap_or(true),
                params.due_before,
                params.due_after,
            )
            .await?;
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn past_due_dates_are_rejected() {
        let today = date(2026, 8, 31);
        let err = validate_due_date(Some(date(2026, 8, 30)), today).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn today_and_future_due_dates_are_accepted() {
        let today = date(2026, 8, 31);
        assert!(validate_due_date(Some(today), today).is_ok());
        assert!(validate_due_date(Some(date(2026, 9, 1)), today).is_ok());
    }

    #[test]
    fn a_missing_due_date_is_fine() {
        assert!(validate_due_date(None, date(2026, 8, 31)).is_ok());
    }
}
