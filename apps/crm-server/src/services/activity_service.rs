use anyhow::Context;
use serde::Deserialize;
use sqlx::PgPool;

use crm_db::models::activity::Activity;
use crm_db::models::deal::Deal;
use crm_db::models::orgs::{Membership, Role};
use crm_db::models::user::User;
use crm_db::repositories::activity_repo::ActivityRepository;
use crm_db::repositories::deal_repo::DealRepository;

use crate::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityDraft {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

fn default_kind() -> String {
    "comment".to_string()
}

/// Members may attach activities only to deals they own; higher roles
/// are unrestricted.
pub fn authorize_activity_author(deal: &Deal, actor_id: i64, role: Role) -> Result<(), ApiError> {
    if role == Role::Member && deal.owner_id != actor_id {
        return Err(ApiError::Forbidden(
            "members can create activity only for their own deals".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ActivityService {
    pool: PgPool,
    activities: ActivityRepository,
    deals: DealRepository,
}

impl ActivityService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            activities: ActivityRepository::new(pool.clone()),
            deals: DealRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn list(&self, org_id: i64, deal_id: i64) -> Result<Vec<Activity>, ApiError> {
        self.deal_in_org(org_id, deal_id).await?;
        let activities = self.activities.list_by_deal(deal_id).await?;
        Ok(activities)
    }

    /// `kind` stays a free-form tag.
    pub async fn create(
        &self,
        actor: &User,
        membership: &Membership,
        deal_id: i64,
        draft: &ActivityDraft,
    ) -> Result<Activity, ApiError> {
        let deal = self.deal_in_org(membership.organization_id, deal_id).await?;
        authorize_activity_author(&deal, actor.id, membership.role)?;

        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection")?;
        let activity = self
            .activities
            .record(
                &mut conn,
                deal.id,
                Some(actor.id),
                &draft.kind,
                draft.payload.clone(),
            )
            .await?;
        Ok(activity)
    }

    async fn deal_in_org(&self, org_id: i64, deal_id: i64) -> Result<Deal, ApiError> {
        match self.deals.get_by_id(deal_id).await? {
            Some(d) if d.organization_id == org_id => Ok(d),
            _ => Err(ApiError::NotFound("deal not found".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crm_db::models::deal::{DealStage, DealStatus};

    fn deal() -> Deal {
        Deal {
            id: 10,
            organization_id: 1,
            contact_id: 5,
            owner_id: 42,
            title: "Test deal".to_string(),
            amount_cents: 100_000,
            currency: "USD".to_string(),
            status: DealStatus::New,
            stage: DealStage::Qualification,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn member_can_attach_only_to_their_own_deals() {
        let err = authorize_activity_author(&deal(), 7, Role::Member).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        assert!(authorize_activity_author(&deal(), 42, Role::Member).is_ok());
    }

    #[test]
    fn higher_roles_attach_to_any_deal() {
        for role in [Role::Manager, Role::Admin, Role::Owner] {
            assert!(authorize_activity_author(&deal(), 7, role).is_ok());
        }
    }
}
