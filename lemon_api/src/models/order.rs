// lemon_api/src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use super::{CartItem, OrderItem, OrderItemDraft};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Order {
  pub id: i64,
  #[serde(rename = "user")]
  pub user_id: i64,
  #[serde(rename = "delivery_crew")]
  pub delivery_crew_id: Option<i64>,
  /// `true` once delivered.
  pub status: bool,
  pub total: Decimal,
  pub date: DateTime<Utc>,
}

/// Fulfillment stage derived from `status` and `delivery_crew`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStage {
  Placed,
  Assigned,
  Delivered,
}

impl Order {
  pub fn stage(&self) -> OrderStage {
    match (self.status, self.delivery_crew_id) {
      (true, _) => OrderStage::Delivered,
      (false, Some(_)) => OrderStage::Assigned,
      (false, None) => OrderStage::Placed,
    }
  }

  pub fn is_assigned_to(&self, user_id: i64) -> bool {
    self.delivery_crew_id == Some(user_id)
  }

  /// Applies a patch in place. Only supplied fields change.
  pub fn apply(&mut self, changes: &OrderChanges) {
    if let Some(status) = changes.status {
      self.status = status;
    }
    if let Some(delivery_crew_id) = changes.delivery_crew_id {
      self.delivery_crew_id = delivery_crew_id;
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
  #[serde(flatten)]
  pub order: Order,
  pub stage: OrderStage,
  pub order_items: Vec<OrderItem>,
}

impl OrderView {
  pub fn new(order: Order, order_items: Vec<OrderItem>) -> Self {
    let stage = order.stage();
    Self {
      order,
      stage,
      order_items,
    }
  }
}

/// Patch for an order. `delivery_crew_id: Some(None)` unassigns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderChanges {
  pub status: Option<bool>,
  pub delivery_crew_id: Option<Option<i64>>,
}

impl OrderChanges {
  pub fn is_empty(&self) -> bool {
    self.status.is_none() && self.delivery_crew_id.is_none()
  }
}

/// Which orders a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
  All,
  AssignedTo(i64),
  OwnedBy(i64),
}

impl OrderScope {
  pub fn includes(&self, order: &Order) -> bool {
    match *self {
      OrderScope::All => true,
      OrderScope::AssignedTo(crew_id) => order.is_assigned_to(crew_id),
      OrderScope::OwnedBy(user_id) => order.user_id == user_id,
    }
  }
}

/// An order computed from a cart, ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
  pub user_id: i64,
  pub total: Decimal,
  pub date: DateTime<Utc>,
  pub items: Vec<OrderItemDraft>,
}

impl OrderDraft {
  /// Snapshots every cart line. Returns `None` for an empty cart.
  pub fn from_cart(user_id: i64, cart: &[CartItem], date: DateTime<Utc>) -> Option<Self> {
    if cart.is_empty() {
      return None;
    }
    let items: Vec<OrderItemDraft> = cart.iter().map(OrderItemDraft::from).collect();
    let total = items.iter().map(|item| item.price).sum();
    Some(Self {
      user_id,
      total,
      date,
      items,
    })
  }
}
