// lemon_api/src/pipelines/contexts.rs

//! Context data for each workflow pipeline. Handlers receive these wrapped in
//! `lemon_flow::ContextData` and write their results back into them.

use chrono::{DateTime, Utc};

use crate::models::{CartItem, MenuItemView, OrderChanges, OrderView, User, UserSummary};
use crate::policy::Actor;
use crate::state::AppState;

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub username: String,
  pub email: String,
  pub password: String,
  pub created_user: Option<UserSummary>,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub username: String,
  pub password: String,
  pub user: Option<User>,
  pub auth_token: Option<String>,
}

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub menuitem_id: i64,
  pub quantity: i32,
  pub menu_item: Option<MenuItemView>,
  pub cart_item: Option<CartItem>,
}

#[derive(Clone)]
pub struct PlaceOrderCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub placed_at: DateTime<Utc>,
  pub order: Option<OrderView>,
}

#[derive(Clone)]
pub struct UpdateOrderCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub order_id: i64,
  pub changes: OrderChanges,
  pub current: Option<OrderView>,
  pub updated: Option<OrderView>,
}
