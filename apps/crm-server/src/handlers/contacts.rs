use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crm_db::models::contact::Contact;

use crate::AppState;
use crate::auth::OrgContext;
use crate::error::ApiError;
use crate::handlers::PageParams;
use crate::services::contact_service::ContactDraft;

#[derive(Debug, Deserialize)]
pub struct ContactListQuery {
    #[serde(default = "super::default_page")]
    pub page: i64,
    #[serde(default = "super::default_page_size")]
    pub page_size: i64,
    pub search: Option<String>,
    pub owner_id: Option<i64>,
}

impl ContactListQuery {
    fn window(&self) -> PageParams {
        PageParams::new(self.page, self.page_size)
    }
}

pub async fn list_contacts(
    State(state): State<AppState>,
    ctx: OrgContext,
    Query(query): Query<ContactListQuery>,
) -> Result<Json<Vec<Contact>>, ApiError> {
    let window = query.window();
    let contacts = state
        .contacts
        .list(
            &ctx.membership,
            query.search.as_deref(),
            query.owner_id,
            window.offset(),
            window.limit(),
        )
        .await?;
    Ok(Json(contacts))
}

pub async fn create_contact(
    State(state): State<AppState>,
    ctx: OrgContext,
    Json(payload): Json<ContactDraft>,
) -> Result<(StatusCode, Json<Contact>), ApiError> {
    let contact = state
        .contacts
        .create(ctx.org.id, ctx.user.id, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    ctx: OrgContext,
    Path(contact_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.contacts.delete(ctx.org.id, contact_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;

    #[test]
    fn pagination_and_search_parse_from_the_query_string() {
        let uri: Uri = "/api/v1/contacts?page=3&page_size=25&search=Acme"
            .parse()
            .unwrap();
        let Query(query) = Query::<ContactListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.page, 3);
        assert_eq!(query.page_size, 25);
        assert_eq!(query.search.as_deref(), Some("Acme"));
        assert_eq!(query.window().offset(), 50);
    }

    #[test]
    fn a_bare_listing_request_uses_the_default_window() {
        let uri: Uri = "/api/v1/contacts".parse().unwrap();
        let Query(query) = Query::<ContactListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 20);
    }
}
