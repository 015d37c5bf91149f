// lemon_api/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use lemon_flow::{ContextData, PipelineResult};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::policy::{self, Action, Resource};
use crate::state::AppState;
use crate::web::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct AddToCartPayload {
  pub menuitem: i64,
  pub quantity: i32,
}

#[instrument(name = "handler::list_cart", skip_all, fields(user_id = auth_user.actor.user_id))]
pub async fn list_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let owner_id = auth_user.actor.user_id;
  policy::enforce(&auth_user.actor, Resource::Cart { owner_id }, Action::List)?;
  let items = app_state.store.list_cart(owner_id).await?;
  Ok(HttpResponse::Ok().json(items))
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, req_payload, auth_user),
  fields(user_id = auth_user.actor.user_id, menuitem_id = tracing::field::Empty, quantity = tracing::field::Empty)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: Result<web::Json<AddToCartPayload>, AppError>,
) -> Result<HttpResponse, AppError> {
  let req_payload = req_payload?;
  let span = tracing::Span::current();
  span.record("menuitem_id", req_payload.menuitem);
  span.record("quantity", req_payload.quantity);
  let ctx_data = ContextData::new(AddToCartCtxData {
    app_state: app_state.get_ref().clone(),
    actor: auth_user.actor,
    menuitem_id: req_payload.menuitem,
    quantity: req_payload.quantity,
    menu_item: None,
    cart_item: None,
  });

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let cart_item = ctx_data
        .read()
        .cart_item
        .clone()
        .ok_or_else(|| AppError::Internal("Cart update completed, but item details are unavailable.".to_string()))?;
      Ok(HttpResponse::Created().json(cart_item))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Add-to-cart pipeline was stopped by a handler.");
      Err(AppError::Internal("Process to add item to cart was halted.".to_string()))
    }
    Err(app_err) => {
      warn!(error = %app_err, "Add-to-cart pipeline failed.");
      Err(app_err)
    }
  }
}

#[instrument(name = "handler::clear_cart", skip_all, fields(user_id = auth_user.actor.user_id))]
pub async fn clear_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let owner_id = auth_user.actor.user_id;
  policy::enforce(&auth_user.actor, Resource::Cart { owner_id }, Action::Delete)?;
  let removed = app_state.store.clear_cart(owner_id).await?;
  info!(removed, "Cart cleared.");
  Ok(HttpResponse::NoContent().finish())
}
