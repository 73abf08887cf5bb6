use anyhow::Context;
use serde::Deserialize;
use sqlx::PgPool;

use crm_db::models::contact::Contact;
use crm_db::models::orgs::{Membership, Role};
use crm_db::repositories::contact_repo::ContactRepository;
use crm_db::repositories::deal_repo::DealRepository;

use crate::error::ApiError;
use crate::services::permission::PermissionService;

#[derive(Debug, Clone, Deserialize)]
pub struct ContactDraft {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A contact referenced by any deal cannot be removed.
pub fn ensure_no_deal_references(has_deals: bool) -> Result<(), ApiError> {
    if has_deals {
        return Err(ApiError::Conflict(
            "contact has deals and cannot be deleted".to_string(),
        ));
    }
    Ok(())
}

/// The `owner_id` filter is honored only for org owners; everyone else
/// gets the unfiltered org listing.
fn effective_owner_filter(membership: &Membership, owner_id: Option<i64>) -> Option<i64> {
    if PermissionService::require_minimum_role(membership, Role::Owner).is_ok() {
        owner_id
    } else {
        None
    }
}

#[derive(Clone)]
pub struct ContactService {
    pool: PgPool,
    contacts: ContactRepository,
    deals: DealRepository,
}

impl ContactService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            contacts: ContactRepository::new(pool.clone()),
            deals: DealRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn list(
        &self,
        membership: &Membership,
        search: Option<&str>,
        owner_id: Option<i64>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Contact>, ApiError> {
        let owner_id = effective_owner_filter(membership, owner_id);
        let contacts = self
            .contacts
            .list_by_org(membership.organization_id, search, owner_id, offset, limit)
            .await?;
        Ok(contacts)
    }

    pub async fn create(
        &self,
        org_id: i64,
        owner_id: i64,
        draft: &ContactDraft,
    ) -> Result<Contact, ApiError> {
        if draft.name.trim().is_empty() {
            return Err(ApiError::InvalidArgument(
                "contact name must not be empty".to_string(),
            ));
        }
        let contact = self
            .contacts
            .create(
                org_id,
                owner_id,
                &draft.name,
                draft.email.as_deref(),
                draft.phone.as_deref(),
            )
            .await?;
        Ok(contact)
    }

    /// Check-then-delete runs in one transaction holding a row lock on
    /// the contact, so a deal created concurrently either commits first
    /// (and the check sees it) or blocks on the FK until we are done.
    pub async fn delete(&self, org_id: i64, contact_id: i64) -> Result<(), ApiError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let contact = self.contacts.lock_by_id(&mut tx, contact_id).await?;
        let contact = match contact {
            Some(c) if c.organization_id == org_id => c,
            _ => return Err(ApiError::NotFound("contact not found".to_string())),
        };

        let has_deals = self.deals.has_deals_for_contact(&mut tx, contact.id).await?;
        ensure_no_deal_references(has_deals)?;

        self.contacts.delete(&mut tx, contact.id).await?;
        tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn membership(role: Role) -> Membership {
        Membership {
            organization_id: 1,
            user_id: 7,
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn referenced_contacts_cannot_be_deleted() {
        let err = ensure_no_deal_references(true).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        assert!(ensure_no_deal_references(false).is_ok());
    }

    #[test]
    fn owner_filter_is_dropped_for_non_owners() {
        assert_eq!(
            effective_owner_filter(&membership(Role::Owner), Some(5)),
            Some(5)
        );
        for role in [Role::Member, Role::Manager, Role::Admin] {
            assert_eq!(effective_owner_filter(&membership(role), Some(5)), None);
        }
    }
}
