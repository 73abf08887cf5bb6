use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Row};

use crate::models::orgs::{Membership, Organization, Role};

#[derive(Debug, Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

impl OrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Organization>> {
        let org = sqlx::query_as::<_, Organization>(
            "SELECT id, name, created_at FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch organization by ID")?;
        Ok(org)
    }

    pub async fn create(&self, conn: &mut PgConnection, name: &str) -> Result<Organization> {
        let org = sqlx::query_as::<_, Organization>(
            "INSERT INTO organizations (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(conn)
        .await
        .context("Failed to create organization")?;
        Ok(org)
    }

    pub async fn add_member(
        &self,
        conn: &mut PgConnection,
        org_id: i64,
        user_id: i64,
        role: Role,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO organization_members (organization_id, user_id, role) VALUES ($1, $2, $3)",
        )
        .bind(org_id)
        .bind(user_id)
        .bind(role.as_str())
        .execute(conn)
        .await
        .context("Failed to add organization member")?;
        Ok(())
    }

    pub async fn get_member(&self, user_id: i64, org_id: i64) -> Result<Option<Membership>> {
        let row = sqlx::query(
            r#"
            SELECT organization_id, user_id, role, created_at
            FROM organization_members
            WHERE user_id = $1 AND organization_id = $2
            "#,
        )
        .bind(user_id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch organization membership")?;

        match row {
            None => Ok(None),
            Some(row) => {
                let role: String = row.try_get("role")?;
                let role = role
                    .parse::<Role>()
                    .context("Stored membership has an unknown role")?;
                Ok(Some(Membership {
                    organization_id: row.try_get("organization_id")?,
                    user_id: row.try_get("user_id")?,
                    role,
                    created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
                }))
            }
        }
    }

    pub async fn list_user_orgs(&self, user_id: i64) -> Result<Vec<Organization>> {
        let orgs = sqlx::query_as::<_, Organization>(
            r#"
            SELECT o.id, o.name, o.created_at
            FROM organizations o
            JOIN organization_members m ON m.organization_id = o.id
            WHERE m.user_id = $1
            ORDER BY o.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list user organizations")?;
        Ok(orgs)
    }
}
