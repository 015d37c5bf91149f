// lemon_api/src/models/order_item.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use super::CartItem;

/// Immutable line of a placed order, copied from a cart item.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct OrderItem {
  pub id: i64,
  #[serde(rename = "order")]
  pub order_id: i64,
  #[serde(rename = "menuitem")]
  pub menuitem_id: i64,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItemDraft {
  pub menuitem_id: i64,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub price: Decimal,
}

impl From<&CartItem> for OrderItemDraft {
  fn from(item: &CartItem) -> Self {
    Self {
      menuitem_id: item.menuitem_id,
      quantity: item.quantity,
      unit_price: item.unit_price,
      price: item.price,
    }
  }
}
