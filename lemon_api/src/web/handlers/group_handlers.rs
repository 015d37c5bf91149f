// lemon_api/src/web/handlers/group_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::errors::AppError;
use crate::models::{Role, UserSummary};
use crate::policy::{self, Action, Resource};
use crate::services::group_service::{self, MembershipChange};
use crate::state::AppState;
use crate::web::AuthenticatedUser;

/// Group segment of `/groups/{group}/users`.
#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum GroupSlug {
  Manager,
  DeliveryCrew,
}

impl From<GroupSlug> for Role {
  fn from(slug: GroupSlug) -> Self {
    match slug {
      GroupSlug::Manager => Role::Manager,
      GroupSlug::DeliveryCrew => Role::DeliveryCrew,
    }
  }
}

#[derive(Deserialize, Debug)]
pub struct AddMemberPayload {
  pub username: String,
}

#[instrument(name = "handler::list_members", skip(app_state, auth_user), fields(user_id = auth_user.actor.user_id))]
pub async fn list_members_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<GroupSlug>,
) -> Result<HttpResponse, AppError> {
  let role = Role::from(path.into_inner());
  policy::enforce(&auth_user.actor, Resource::Group(role), Action::List)?;

  let members: Vec<UserSummary> = app_state
    .store
    .list_role_members(role)
    .await?
    .iter()
    .map(UserSummary::from)
    .collect();
  Ok(HttpResponse::Ok().json(members))
}

#[instrument(name = "handler::add_member", skip(app_state, payload, auth_user), fields(user_id = auth_user.actor.user_id))]
pub async fn add_member_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<GroupSlug>,
  payload: Result<web::Json<AddMemberPayload>, AppError>,
) -> Result<HttpResponse, AppError> {
  let role = Role::from(path.into_inner());
  policy::enforce(&auth_user.actor, Resource::Group(role), Action::Create)?;
  let payload = payload?;

  let outcome = group_service::add_member(app_state.store.as_ref(), role, payload.username.trim()).await?;
  let body = json!({ "message": outcome.message() });
  match outcome.change {
    MembershipChange::Added => Ok(HttpResponse::Created().json(body)),
    _ => Ok(HttpResponse::Ok().json(body)),
  }
}

#[instrument(name = "handler::remove_member", skip(app_state, auth_user), fields(user_id = auth_user.actor.user_id))]
pub async fn remove_member_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<(GroupSlug, i64)>,
) -> Result<HttpResponse, AppError> {
  let (slug, member_id) = path.into_inner();
  let role = Role::from(slug);
  policy::enforce(&auth_user.actor, Resource::Group(role), Action::Delete)?;

  let outcome = group_service::remove_member(app_state.store.as_ref(), role, member_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": outcome.message() })))
}
