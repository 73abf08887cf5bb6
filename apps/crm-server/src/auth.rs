use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crm_db::models::orgs::{Membership, Organization};
use crm_db::models::user::User;

use crate::AppState;
use crate::config::AppConfig;
use crate::error::ApiError;

pub const ORG_HEADER: &str = "X-Organization-Id";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    /// "access" or "refresh"; the two kinds are never interchangeable.
    pub kind: String,
}

fn issue_token(config: &AppConfig, user_id: i64, kind: &str, ttl: chrono::Duration) -> Result<String, ApiError> {
    let exp = (chrono::Utc::now() + ttl).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp,
        kind: kind.to_string(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to sign token: {e}")))?;
    Ok(token)
}

pub fn issue_access_token(config: &AppConfig, user_id: i64) -> Result<String, ApiError> {
    issue_token(
        config,
        user_id,
        "access",
        chrono::Duration::minutes(config.access_token_ttl_minutes),
    )
}

pub fn issue_refresh_token(config: &AppConfig, user_id: i64) -> Result<String, ApiError> {
    issue_token(
        config,
        user_id,
        "refresh",
        chrono::Duration::days(config.refresh_token_ttl_days),
    )
}

/// Decodes a token and checks its kind. Any failure is reported as a
/// plain 401 without detail.
pub fn decode_token(config: &AppConfig, token: &str, expected_kind: &str) -> Result<i64, ApiError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| ApiError::Unauthenticated("invalid or expired token".to_string()))?;

    if data.claims.kind != expected_kind {
        return Err(ApiError::Unauthenticated(
            "invalid or expired token".to_string(),
        ));
    }
    data.claims
        .sub
        .parse::<i64>()
        .map_err(|_| ApiError::Unauthenticated("invalid or expired token".to_string()))
}

fn extract_bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// The authenticated caller, resolved from the bearer access token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            ApiError::Unauthenticated("missing authorization header".to_string())
        })?;
        let user_id = decode_token(&state.config, token, "access")?;
        let user = state
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthenticated("user not found".to_string()))?;
        Ok(CurrentUser(user))
    }
}

/// Organization scope for a request: the caller, the organization named
/// by the explicit `X-Organization-Id` header, and the caller's
/// membership in it. Organization selection is never inferred from the
/// token; a valid user with no membership here is rejected.
#[derive(Debug, Clone)]
pub struct OrgContext {
    pub user: User,
    pub org: Organization,
    pub membership: Membership,
}

impl FromRequestParts<AppState> for OrgContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        let org_id = parts
            .headers
            .get(ORG_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::InvalidArgument(format!("{ORG_HEADER} header required"))
            })?
            .parse::<i64>()
            .map_err(|_| {
                ApiError::InvalidArgument(format!("{ORG_HEADER} must be an integer id"))
            })?;

        let (org, membership) = state.permissions.resolve_membership(user.id, org_id).await?;
        Ok(OrgContext {
            user,
            org,
            membership,
        })
    }
}
