use anyhow::{Context, Result};
use sqlx::{PgConnection, PgPool};

use crate::models::contact::Contact;

const CONTACT_COLUMNS: &str = "id, organization_id, owner_id, name, email, phone, created_at";

#[derive(Debug, Clone)]
pub struct ContactRepository {
    pool: PgPool,
}

impl ContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Contact>> {
        let contact = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch contact by ID")?;
        Ok(contact)
    }

    pub async fn list_by_org(
        &self,
        org_id: i64,
        search: Option<&str>,
        owner_id: Option<i64>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Contact>> {
        let contacts = sqlx::query_as::<_, Contact>(&format!(
            r#"
            SELECT {CONTACT_COLUMNS} FROM contacts
            WHERE organization_id = $1
              AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')
              AND ($3::bigint IS NULL OR owner_id = $3)
            ORDER BY created_at DESC
            OFFSET $4 LIMIT $5
            "#
        ))
        .bind(org_id)
        .bind(search)
        .bind(owner_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list contacts")?;
        Ok(contacts)
    }

    pub async fn create(
        &self,
        org_id: i64,
        owner_id: i64,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Contact> {
        let contact = sqlx::query_as::<_, Contact>(&format!(
            r#"
            INSERT INTO contacts (organization_id, owner_id, name, email, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(org_id)
        .bind(owner_id)
        .bind(name)
        .bind(email)
        .bind(phone)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create contact")?;
        Ok(contact)
    }

    /// Locks the contact row for the rest of the transaction. The
    /// deletion flow must hold this lock across its deal-reference check
    /// so a concurrent deal insert cannot slip between check and delete.
    pub async fn lock_by_id(&self, conn: &mut PgConnection, id: i64) -> Result<Option<Contact>> {
        let contact = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("Failed to lock contact row")?;
        Ok(contact)
    }

    pub async fn delete(&self, conn: &mut PgConnection, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .context("Failed to delete contact")?;
        Ok(())
    }
}
