// lemon_api/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use lemon_flow::{ContextData, PipelineResult};
use serde::{Deserialize, Deserializer};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::OrderChanges;
use crate::pipelines::contexts::{PlaceOrderCtxData, UpdateOrderCtxData};
use crate::policy::{self, Action, Resource, NOT_FOUND_MESSAGE};
use crate::state::AppState;
use crate::web::AuthenticatedUser;

/// Accepts `true`/`false`, `1`/`0`, or their string forms.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum StatusValue {
  Flag(bool),
  Number(i64),
  Text(String),
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
  D: Deserializer<'de>,
{
  use serde::de::Error;

  match Option::<StatusValue>::deserialize(deserializer)? {
    None => Ok(None),
    Some(StatusValue::Flag(flag)) => Ok(Some(flag)),
    Some(StatusValue::Number(0)) => Ok(Some(false)),
    Some(StatusValue::Number(1)) => Ok(Some(true)),
    Some(StatusValue::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
      "0" | "false" => Ok(Some(false)),
      "1" | "true" => Ok(Some(true)),
      _ => Err(D::Error::custom("status must be true/false or 1/0")),
    },
    Some(StatusValue::Number(_)) => Err(D::Error::custom("status must be true/false or 1/0")),
  }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn deserialize_nullable<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
  D: Deserializer<'de>,
{
  Option::<i64>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize, Debug, Default)]
pub struct UpdateOrderPayload {
  #[serde(default, deserialize_with = "deserialize_status")]
  pub status: Option<bool>,
  #[serde(default, deserialize_with = "deserialize_nullable")]
  pub delivery_crew: Option<Option<i64>>,
}

impl From<UpdateOrderPayload> for OrderChanges {
  fn from(payload: UpdateOrderPayload) -> Self {
    OrderChanges {
      status: payload.status,
      delivery_crew_id: payload.delivery_crew,
    }
  }
}

#[instrument(name = "handler::list_orders", skip_all, fields(user_id = auth_user.actor.user_id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  policy::enforce(&auth_user.actor, Resource::Orders, Action::List)?;
  let scope = policy::order_scope(&auth_user.actor);
  let orders = app_state.store.list_orders(scope).await?;
  info!(?scope, count = orders.len(), "Orders listed.");
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::place_order", skip_all, fields(user_id = auth_user.actor.user_id))]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(PlaceOrderCtxData {
    app_state: app_state.get_ref().clone(),
    actor: auth_user.actor,
    placed_at: Utc::now(),
    order: None,
  });

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let placed = ctx_data
        .read()
        .order
        .clone()
        .ok_or_else(|| AppError::Internal("Order placement completed without an order.".to_string()))?;
      Ok(HttpResponse::Created().json(placed))
    }
    PipelineResult::Stopped => {
      warn!("Place-order pipeline was stopped by a handler.");
      Err(AppError::Internal("Order placement was halted.".to_string()))
    }
  }
}

#[instrument(name = "handler::get_order", skip(app_state, auth_user), fields(order_id = %path.as_ref(), user_id = auth_user.actor.user_id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .store
    .find_order(path.into_inner())
    .await?
    .ok_or_else(|| AppError::NotFound(NOT_FOUND_MESSAGE.to_string()))?;
  policy::enforce(&auth_user.actor, Resource::Order(&order.order), Action::View)?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(
  name = "handler::update_order",
  skip(app_state, payload, auth_user),
  fields(order_id = %path.as_ref(), user_id = auth_user.actor.user_id)
)]
pub async fn update_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
  payload: Result<web::Json<UpdateOrderPayload>, AppError>,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(UpdateOrderCtxData {
    app_state: app_state.get_ref().clone(),
    actor: auth_user.actor,
    order_id: path.into_inner(),
    changes: OrderChanges::from(payload?.into_inner()),
    current: None,
    updated: None,
  });

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let updated = ctx_data
        .read()
        .updated
        .clone()
        .ok_or_else(|| AppError::Internal("Order update completed without a result.".to_string()))?;
      Ok(HttpResponse::Ok().json(updated))
    }
    PipelineResult::Stopped => Err(AppError::Internal("Order update was halted.".to_string())),
  }
}

#[instrument(
  name = "handler::delete_order",
  skip(app_state, auth_user),
  fields(order_id = %path.as_ref(), user_id = auth_user.actor.user_id)
)]
pub async fn delete_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let order = app_state
    .store
    .find_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(NOT_FOUND_MESSAGE.to_string()))?;
  policy::enforce(&auth_user.actor, Resource::Order(&order.order), Action::Delete)?;

  if !app_state.store.delete_order(order_id).await? {
    return Err(AppError::NotFound(NOT_FOUND_MESSAGE.to_string()));
  }
  info!("Order deleted.");
  Ok(HttpResponse::NoContent().finish())
}
