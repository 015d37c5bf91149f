// lemon_api/src/models/menu_item.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use super::Category;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct MenuItem {
  pub id: i64,
  pub title: String,
  pub price: Decimal,
  pub featured: bool,
  pub category_id: i64,
}

/// A menu item as returned to clients, with its category nested.
#[derive(Debug, Clone, Serialize)]
pub struct MenuItemView {
  pub id: i64,
  pub title: String,
  pub price: Decimal,
  pub featured: bool,
  pub category: Category,
}

impl MenuItemView {
  pub fn new(item: MenuItem, category: Category) -> Self {
    Self {
      id: item.id,
      title: item.title,
      price: item.price,
      featured: item.featured,
      category,
    }
  }
}

#[derive(Debug, Clone)]
pub struct NewMenuItem {
  pub title: String,
  pub price: Decimal,
  pub featured: bool,
  pub category_id: i64,
}

/// Field-wise update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct MenuItemChanges {
  pub title: Option<String>,
  pub price: Option<Decimal>,
  pub featured: Option<bool>,
  pub category_id: Option<i64>,
}

impl MenuItemChanges {
  pub fn is_empty(&self) -> bool {
    self.title.is_none() && self.price.is_none() && self.featured.is_none() && self.category_id.is_none()
  }

  pub fn apply_to(&self, item: &mut MenuItem) {
    if let Some(title) = &self.title {
      item.title = title.clone();
    }
    if let Some(price) = self.price {
      item.price = price;
    }
    if let Some(featured) = self.featured {
      item.featured = featured;
    }
    if let Some(category_id) = self.category_id {
      item.category_id = category_id;
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MenuOrdering {
  #[default]
  Id,
  TitleAsc,
  TitleDesc,
  PriceAsc,
  PriceDesc,
}

impl MenuOrdering {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw {
      "id" => Some(MenuOrdering::Id),
      "title" => Some(MenuOrdering::TitleAsc),
      "-title" => Some(MenuOrdering::TitleDesc),
      "price" => Some(MenuOrdering::PriceAsc),
      "-price" => Some(MenuOrdering::PriceDesc),
      _ => None,
    }
  }

  /// `ORDER BY` clause body. Ties always break on id.
  pub fn sql(self) -> &'static str {
    match self {
      MenuOrdering::Id => "m.id ASC",
      MenuOrdering::TitleAsc => "m.title ASC, m.id ASC",
      MenuOrdering::TitleDesc => "m.title DESC, m.id ASC",
      MenuOrdering::PriceAsc => "m.price ASC, m.id ASC",
      MenuOrdering::PriceDesc => "m.price DESC, m.id ASC",
    }
  }
}

/// Catalog query. Every criterion is optional.
#[derive(Debug, Clone, Default)]
pub struct MenuItemFilter {
  pub category_slug: Option<String>,
  pub featured: Option<bool>,
  pub search: Option<String>,
  pub ordering: MenuOrdering,
  pub limit: Option<u32>,
  pub offset: u32,
}
