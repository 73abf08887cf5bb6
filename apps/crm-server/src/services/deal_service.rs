use anyhow::Context;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crm_db::models::deal::{Deal, DealStage, DealStatus};
use crm_db::models::orgs::{Membership, Role};
use crm_db::models::user::User;
use crm_db::repositories::activity_repo::ActivityRepository;
use crm_db::repositories::contact_repo::ContactRepository;
use crm_db::repositories::deal_repo::DealRepository;

use crate::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
pub struct DealDraft {
    pub contact_id: i64,
    pub title: String,
    #[serde(default)]
    pub amount_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DealPatch {
    pub status: Option<DealStatus>,
    pub stage: Option<DealStage>,
    pub title: Option<String>,
    pub amount_cents: Option<i64>,
}

/// The validated outcome of a patch request: final field values plus the
/// transitions that actually change something. Computed up front so a
/// rejected patch never touches the store (validate-then-apply).
#[derive(Debug, Clone, PartialEq)]
pub struct PatchPlan {
    pub title: String,
    pub amount_cents: i64,
    pub status: DealStatus,
    pub stage: DealStage,
    pub status_change: Option<(DealStatus, DealStatus)>,
    pub stage_change: Option<(DealStage, DealStage)>,
}

#[derive(Clone)]
pub struct DealService {
    pool: PgPool,
    deals: DealRepository,
    contacts: ContactRepository,
    activities: ActivityRepository,
}

impl DealService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            deals: DealRepository::new(pool.clone()),
            contacts: ContactRepository::new(pool.clone()),
            activities: ActivityRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn create(
        &self,
        org_id: i64,
        owner_id: i64,
        draft: &DealDraft,
    ) -> Result<Deal, ApiError> {
        if draft.currency.len() != 3 || !draft.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ApiError::InvalidArgument(
                "currency must be a 3-letter code".to_string(),
            ));
        }

        let contact = self.contacts.get_by_id(draft.contact_id).await?;
        let contact = match contact {
            Some(c) if c.organization_id == org_id => c,
            // Cross-org contacts are reported exactly like missing ones.
            _ => {
                return Err(ApiError::NotFound(
                    "contact not found in organization".to_string(),
                ));
            }
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        let deal = self
            .deals
            .create(
                &mut tx,
                org_id,
                contact.id,
                owner_id,
                &draft.title,
                draft.amount_cents,
                &draft.currency,
            )
            .await?;
        self.activities
            .record(
                &mut tx,
                deal.id,
                Some(owner_id),
                "deal_created",
                json!({ "title": deal.title }),
            )
            .await?;
        tx.commit().await.context("Failed to commit transaction")?;
        Ok(deal)
    }

    /// Fetches a deal, reporting absent and cross-org deals identically.
    pub async fn get_in_org(&self, org_id: i64, deal_id: i64) -> Result<Deal, ApiError> {
        match self.deals.get_by_id(deal_id).await? {
            Some(d) if d.organization_id == org_id => Ok(d),
            _ => Err(ApiError::NotFound("deal not found".to_string())),
        }
    }

    pub async fn list(
        &self,
        org_id: i64,
        filter: &crm_db::repositories::deal_repo::DealFilter,
        order_by: crm_db::repositories::deal_repo::DealOrderBy,
        descending: bool,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Deal>, ApiError> {
        let deals = self
            .deals
            .list_by_org(org_id, filter, order_by, descending, offset, limit)
            .await?;
        Ok(deals)
    }

    /// Pure transition legality. Checks run in a fixed order: ownership
    /// gate, then amount/title, then status (against the post-patch
    /// amount), then stage.
    pub fn plan_patch(
        deal: &Deal,
        patch: &DealPatch,
        actor_id: i64,
        role: Role,
    ) -> Result<PatchPlan, ApiError> {
        if role == Role::Member && deal.owner_id != actor_id {
            return Err(ApiError::Forbidden(
                "members can update only their own deals".to_string(),
            ));
        }

        let amount_cents = patch.amount_cents.unwrap_or(deal.amount_cents);
        let title = patch.title.clone().unwrap_or_else(|| deal.title.clone());

        let mut status = deal.status;
        let mut status_change = None;
        if let Some(new_status) = patch.status {
            if new_status == DealStatus::Won && amount_cents <= 0 {
                return Err(ApiError::InvalidTransition(
                    "cannot set status won when amount <= 0".to_string(),
                ));
            }
            if new_status != deal.status {
                status_change = Some((deal.status, new_status));
                status = new_status;
            }
        }

        let mut stage = deal.stage;
        let mut stage_change = None;
        if let Some(new_stage) = patch.stage {
            if new_stage.index() < deal.stage.index()
                && !matches!(role, Role::Admin | Role::Owner)
            {
                return Err(ApiError::Forbidden(
                    "stage rollback forbidden for your role".to_string(),
                ));
            }
            // A privileged rollback is persisted and logged the same way
            // a forward move is.
            if new_stage.index() != deal.stage.index() {
                stage_change = Some((deal.stage, new_stage));
                stage = new_stage;
            }
        }

        Ok(PatchPlan {
            title,
            amount_cents,
            status,
            stage,
            status_change,
            stage_change,
        })
    }

    /// Deletion gate, same ownership rule as patching.
    pub fn plan_delete(deal: &Deal, actor_id: i64, role: Role) -> Result<(), ApiError> {
        if role == Role::Member && deal.owner_id != actor_id {
            return Err(ApiError::Forbidden(
                "members can delete only their own deals".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies a patch in one transaction: a single row update plus one
    /// activity per committed status/stage transition. A failed activity
    /// insert rolls the whole mutation back.
    pub async fn patch(
        &self,
        actor: &User,
        membership: &Membership,
        deal: Deal,
        patch: &DealPatch,
    ) -> Result<Deal, ApiError> {
        let plan = Self::plan_patch(&deal, patch, actor.id, membership.role)?;

        let mut updated = deal;
        updated.title = plan.title;
        updated.amount_cents = plan.amount_cents;
        updated.status = plan.status;
        updated.stage = plan.stage;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        let updated = self.deals.update(&mut tx, &updated).await?;

        let at = Utc::now().to_rfc3339();
        if let Some((from, to)) = plan.status_change {
            self.activities
                .record(
                    &mut tx,
                    updated.id,
                    Some(actor.id),
                    "status_changed",
                    json!({ "from": from.as_str(), "to": to.as_str(), "at": at }),
                )
                .await?;
        }
        if let Some((from, to)) = plan.stage_change {
            self.activities
                .record(
                    &mut tx,
                    updated.id,
                    Some(actor.id),
                    "stage_changed",
                    json!({ "from": from.as_str(), "to": to.as_str(), "at": at }),
                )
                .await?;
        }
        tx.commit().await.context("Failed to commit transaction")?;
        Ok(updated)
    }

    pub async fn delete(
        &self,
        actor: &User,
        membership: &Membership,
        deal: &Deal,
    ) -> Result<(), ApiError> {
        Self::plan_delete(deal, actor.id, membership.role)?;

        // The audit record is written before the row goes away;
        // activities carry no FK to deals, so it survives the delete.
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        self.activities
            .record(
                &mut tx,
                deal.id,
                Some(actor.id),
                "deal_deleted",
                json!({ "title": deal.title }),
            )
            .await?;
        self.deals.delete(&mut tx, deal.id).await?;
        tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

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

    fn patch_status(status: DealStatus) -> DealPatch {
        DealPatch {
            status: Some(status),
            ..DealPatch::default()
        }
    }

    fn patch_stage(stage: DealStage) -> DealPatch {
        DealPatch {
            stage: Some(stage),
            ..DealPatch::default()
        }
    }

    #[test]
    fn won_with_positive_amount_succeeds_and_logs_one_transition() {
        let plan =
            DealService::plan_patch(&deal(), &patch_status(DealStatus::Won), 42, Role::Member)
                .unwrap();
        assert_eq!(plan.status, DealStatus::Won);
        assert_eq!(plan.status_change, Some((DealStatus::New, DealStatus::Won)));
        assert_eq!(plan.stage_change, None);
    }

    #[test]
    fn won_with_non_positive_amount_is_an_invalid_transition() {
        let mut d = deal();
        d.amount_cents = 0;
        let err = DealService::plan_patch(&d, &patch_status(DealStatus::Won), 42, Role::Owner)
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidTransition(_)));
    }

    #[test]
    fn won_check_uses_the_amount_from_the_same_patch() {
        // Old amount is zero; the patch raises it and sets won in one go.
        let mut d = deal();
        d.amount_cents = 0;
        let patch = DealPatch {
            status: Some(DealStatus::Won),
            amount_cents: Some(50_00),
            ..DealPatch::default()
        };
        let plan = DealService::plan_patch(&d, &patch, 42, Role::Member).unwrap();
        assert_eq!(plan.amount_cents, 50_00);
        assert_eq!(plan.status, DealStatus::Won);

        // And the reverse: zeroing the amount while setting won fails.
        let patch = DealPatch {
            status: Some(DealStatus::Won),
            amount_cents: Some(0),
            ..DealPatch::default()
        };
        let err = DealService::plan_patch(&deal(), &patch, 42, Role::Member).unwrap_err();
        assert!(matches!(err, ApiError::InvalidTransition(_)));
    }

    #[test]
    fn same_status_is_a_no_op_without_activity() {
        let plan =
            DealService::plan_patch(&deal(), &patch_status(DealStatus::New), 42, Role::Member)
                .unwrap();
        assert_eq!(plan.status_change, None);
    }

    #[test]
    fn member_cannot_touch_a_deal_they_do_not_own() {
        let err = DealService::plan_patch(
            &deal(),
            &patch_status(DealStatus::InProgress),
            7,
            Role::Member,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        // Any higher role may.
        assert!(DealService::plan_patch(
            &deal(),
            &patch_status(DealStatus::InProgress),
            7,
            Role::Manager,
        )
        .is_ok());
    }

    #[test]
    fn member_cannot_delete_a_deal_they_do_not_own() {
        let err = DealService::plan_delete(&deal(), 7, Role::Member).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        assert!(DealService::plan_delete(&deal(), 42, Role::Member).is_ok());
        assert!(DealService::plan_delete(&deal(), 7, Role::Manager).is_ok());
    }

    #[test]
    fn forward_stage_move_is_logged() {
        let plan =
            DealService::plan_patch(&deal(), &patch_stage(DealStage::Proposal), 42, Role::Member)
                .unwrap();
        assert_eq!(
            plan.stage_change,
            Some((DealStage::Qualification, DealStage::Proposal))
        );
    }

    #[test]
    fn stage_rollback_is_forbidden_below_admin() {
        let mut d = deal();
        d.stage = DealStage::Negotiation;
        for role in [Role::Member, Role::Manager] {
            let err = DealService::plan_patch(
                &d,
                &patch_stage(DealStage::Qualification),
                42,
                role,
            )
            .unwrap_err();
            assert!(matches!(err, ApiError::Forbidden(_)));
        }
    }

    #[test]
    fn privileged_stage_rollback_is_persisted_and_logged() {
        let mut d = deal();
        d.stage = DealStage::Negotiation;
        for role in [Role::Admin, Role::Owner] {
            let plan =
                DealService::plan_patch(&d, &patch_stage(DealStage::Qualification), 42, role)
                    .unwrap();
            assert_eq!(plan.stage, DealStage::Qualification);
            assert_eq!(
                plan.stage_change,
                Some((DealStage::Negotiation, DealStage::Qualification))
            );
        }
    }

    #[test]
    fn same_stage_is_a_no_op_without_activity() {
        let plan = DealService::plan_patch(
            &deal(),
            &patch_stage(DealStage::Qualification),
            42,
            Role::Member,
        )
        .unwrap();
        assert_eq!(plan.stage_change, None);
        assert_eq!(plan.stage, DealStage::Qualification);
    }

    #[test]
    fn title_and_amount_survive_alongside_transitions() {
        let patch = DealPatch {
            status: Some(DealStatus::InProgress),
            stage: Some(DealStage::Proposal),
            title: Some("Renamed".to_string()),
            amount_cents: Some(250_000),
        };
        let plan = DealService::plan_patch(&deal(), &patch, 42, Role::Member).unwrap();
        assert_eq!(plan.title, "Renamed");
        assert_eq!(plan.amount_cents, 250_000);
        assert!(plan.status_change.is_some());
        assert!(plan.stage_change.is_some());
    }
}
