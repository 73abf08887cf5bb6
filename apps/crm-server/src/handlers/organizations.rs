use axum::Json;
use axum::extract::State;

use crm_db::models::orgs::Organization;

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

pub async fn my_organizations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Organization>>, ApiError> {
    let orgs = state.orgs.list_user_orgs(user.id).await?;
    Ok(Json(orgs))
}
