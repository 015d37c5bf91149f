// lemon_api/src/web/handlers/category_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::NewCategory;
use crate::policy::{self, Action, Resource};
use crate::services::catalog_service;
use crate::state::AppState;
use crate::web::AuthenticatedUser;

#[instrument(name = "handler::list_categories", skip_all)]
pub async fn list_categories_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  policy::enforce(&auth_user.actor, Resource::Catalog, Action::List)?;
  let categories = app_state.store.list_categories().await?;
  Ok(HttpResponse::Ok().json(categories))
}

#[instrument(name = "handler::create_category", skip(app_state, payload, auth_user), fields(user_id = auth_user.actor.user_id))]
pub async fn create_category_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: Result<web::Json<NewCategory>, AppError>,
) -> Result<HttpResponse, AppError> {
  policy::enforce(&auth_user.actor, Resource::Catalog, Action::Create)?;
  let payload = payload?;

  let new_category = NewCategory {
    slug: catalog_service::validate_slug(&payload.slug)?,
    title: catalog_service::validate_title(&payload.title)?,
  };
  let category = app_state.store.create_category(new_category).await?;
  info!(category_id = category.id, slug = %category.slug, "Category created.");
  Ok(HttpResponse::Created().json(category))
}
