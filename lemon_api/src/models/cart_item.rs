// lemon_api/src/models/cart_item.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use super::money::line_price;
use super::MenuItemView;

/// A pending line in a user's cart. At most one per (user, menu item).
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CartItem {
  pub id: i64,
  #[serde(rename = "user")]
  pub user_id: i64,
  #[serde(rename = "menuitem")]
  pub menuitem_id: i64,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewCartItem {
  pub user_id: i64,
  pub menuitem_id: i64,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub price: Decimal,
}

impl NewCartItem {
  /// Snapshots the menu item's current price as the unit price.
  pub fn snapshot(user_id: i64, menu_item: &MenuItemView, quantity: i32) -> Self {
    Self {
      user_id,
      menuitem_id: menu_item.id,
      quantity,
      unit_price: menu_item.price,
      price: line_price(menu_item.price, quantity),
    }
  }
}
