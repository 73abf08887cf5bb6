use sqlx::PgPool;

use crm_db::models::orgs::{Membership, Organization, Role};
use crm_db::repositories::org_repo::OrganizationRepository;

use crate::error::ApiError;

/// Read-only authorization guard. Every org-scoped operation resolves
/// its membership through here before touching domain state.
#[derive(Debug, Clone)]
pub struct PermissionService {
    orgs: OrganizationRepository,
}

impl PermissionService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            orgs: OrganizationRepository::new(pool),
        }
    }

    /// An absent organization is a 404; an existing organization the
    /// user is not a member of is a 403 (membership existence is not
    /// treated as a secret once the org id itself is known).
    pub async fn resolve_membership(
        &self,
        user_id: i64,
        org_id: i64,
    ) -> Result<(Organization, Membership), ApiError> {
        let org = self
            .orgs
            .get_by_id(org_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("organization not found".to_string()))?;

        let membership = self
            .orgs
            .get_member(user_id, org.id)
            .await?
            .ok_or_else(|| {
                ApiError::Forbidden("not a member of this organization".to_string())
            })?;

        Ok((org, membership))
    }

    /// Minimum-role check over the hierarchy (member < manager < admin
    /// < owner).
    pub fn require_minimum_role(
        membership: &Membership,
        required: Role,
    ) -> Result<(), ApiError> {
        if membership.role.meets_minimum(required) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "you don't have enough permissions".to_string(),
            ))
        }
    }

    /// Exact allowed-set check, independent of the hierarchy.
    pub fn require_role_in(membership: &Membership, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&membership.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "you don't have enough permissions".to_string(),
            ))
        }
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
    fn minimum_role_passes_for_equal_and_higher_roles() {
        for role in [Role::Manager, Role::Admin, Role::Owner] {
            assert!(
                PermissionService::require_minimum_role(&membership(role), Role::Manager).is_ok()
            );
        }
        assert!(
            PermissionService::require_minimum_role(&membership(Role::Member), Role::Manager)
                .is_err()
        );
    }

    #[test]
    fn allowed_set_check_ignores_the_hierarchy() {
        // Owner outranks admin but is not in the set.
        let allowed = [Role::Admin];
        assert!(PermissionService::require_role_in(&membership(Role::Admin), &allowed).is_ok());
        assert!(PermissionService::require_role_in(&membership(Role::Owner), &allowed).is_err());
    }

    #[test]
    fn failed_checks_are_forbidden() {
        let err = PermissionService::require_minimum_role(&membership(Role::Member), Role::Owner)
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
