use anyhow::Context;
use serde::Serialize;
use sqlx::PgPool;

use crm_db::models::orgs::Role;
use crm_db::repositories::org_repo::OrganizationRepository;
use crm_db::repositories::user_repo::UserRepository;

use crate::auth::{issue_access_token, issue_refresh_token};
use crate::config::AppConfig;
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i64>,
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    config: AppConfig,
    users: UserRepository,
    orgs: OrganizationRepository,
}

impl AuthService {
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            orgs: OrganizationRepository::new(pool.clone()),
            pool,
            config,
        }
    }

    /// Registration creates the user, the organization and its first
    /// owner membership atomically.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
        organization_name: &str,
    ) -> Result<TokenPair, ApiError> {
        if !email.contains('@') {
            return Err(ApiError::InvalidArgument(
                "email is not a valid address".to_string(),
            ));
        }
        if self.users.get_by_email(email).await?.is_some() {
            return Err(ApiError::Conflict("email already registered".to_string()));
        }

        let password_hash =
            bcrypt::hash(password, bcrypt::DEFAULT_COST).context("Failed to hash password")?;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        let user = self
            .users
            .create(&mut tx, email, &password_hash, name)
            .await?;
        let org = self.orgs.create(&mut tx, organization_name).await?;
        self.orgs
            .add_member(&mut tx, org.id, user.id, Role::Owner)
            .await?;
        tx.commit().await.context("Failed to commit transaction")?;

        Ok(TokenPair {
            access_token: issue_access_token(&self.config, user.id)?,
            refresh_token: issue_refresh_token(&self.config, user.id)?,
            token_type: "bearer",
            organization_id: Some(org.id),
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ApiError> {
        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| ApiError::Unauthenticated("invalid credentials".to_string()))?;

        let is_valid = bcrypt::verify(password, &user.password_hash).unwrap_or(false);
        if !is_valid {
            return Err(ApiError::Unauthenticated("invalid credentials".to_string()));
        }

        Ok(TokenPair {
            access_token: issue_access_token(&self.config, user.id)?,
            refresh_token: issue_refresh_token(&self.config, user.id)?,
            token_type: "bearer",
            organization_id: None,
        })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let user_id = crate::auth::decode_token(&self.config, refresh_token, "refresh")?;
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthenticated("user not found".to_string()))?;

        Ok(TokenPair {
            access_token: issue_access_token(&self.config, user.id)?,
            refresh_token: issue_refresh_token(&self.config, user.id)?,
            token_type: "bearer",
            organization_id: None,
        })
    }
}
