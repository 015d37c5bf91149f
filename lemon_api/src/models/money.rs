// lemon_api/src/models/money.rs

//! Decimal money helpers. Prices are stored with two decimal places.

use rust_decimal::Decimal;

pub const PRICE_SCALE: u32 = 2;

/// Upper bound for a cart line's quantity.
pub const MAX_QUANTITY: i32 = i16::MAX as i32;

/// Precision of the `cart_items.price` and `order_items.price` columns.
pub const LINE_PRICE_PRECISION: u32 = 14;

/// Largest price a `NUMERIC(6, 2)` column holds.
pub fn max_unit_price() -> Decimal {
  Decimal::new(999_999, PRICE_SCALE)
}

/// Checks a catalog price and returns it rescaled to two decimal places.
pub fn validate_unit_price(price: Decimal) -> Result<Decimal, String> {
  if price <= Decimal::ZERO {
    return Err("Price must be greater than zero.".to_string());
  }
  if price.normalize().scale() > PRICE_SCALE {
    return Err("Price must have no more than 2 decimal places.".to_string());
  }
  if price > max_unit_price() {
    return Err(format!("Price must not exceed {}.", max_unit_price()));
  }
  let mut rescaled = price;
  rescaled.rescale(PRICE_SCALE);
  Ok(rescaled)
}

/// `unit_price × quantity`.
pub fn line_price(unit_price: Decimal, quantity: i32) -> Decimal {
  unit_price * Decimal::from(quantity)
}
