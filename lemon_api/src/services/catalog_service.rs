// lemon_api/src/services/catalog_service.rs

use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::errors::{AppError, Result as AppResult};
use crate::models::money::validate_unit_price;
use crate::models::{Category, NewCategory, NewMenuItem};
use crate::store::Store;

pub const TITLE_MAX_LEN: usize = 255;

/// Trims and bounds a menu item or category title.
pub fn validate_title(raw: &str) -> AppResult<String> {
  let title = raw.trim();
  if title.is_empty() {
    return Err(AppError::Validation("Title may not be blank.".to_string()));
  }
  if title.chars().count() > TITLE_MAX_LEN {
    return Err(AppError::Validation(format!(
      "Title may not exceed {} characters.",
      TITLE_MAX_LEN
    )));
  }
  Ok(title.to_string())
}

pub fn validate_price(price: Decimal) -> AppResult<Decimal> {
  validate_unit_price(price).map_err(AppError::Validation)
}

pub fn validate_slug(raw: &str) -> AppResult<String> {
  let slug = raw.trim();
  let well_formed = !slug.is_empty()
    && slug.len() <= TITLE_MAX_LEN
    && slug
      .chars()
      .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
  if !well_formed {
    return Err(AppError::Validation(
      "Enter a valid slug of lowercase letters, numbers, underscores or hyphens.".to_string(),
    ));
  }
  Ok(slug.to_string())
}

/// Looks up a category a write refers to; a missing one is a client error.
pub async fn require_category(store: &dyn Store, category_id: i64) -> AppResult<Category> {
  store
    .find_category(category_id)
    .await?
    .ok_or_else(|| AppError::Validation(format!("Invalid category id {} - object does not exist.", category_id)))
}

const SAMPLE_MENU: &[(&str, &str, &[(&str, i64, bool)])] = &[
  ("starters", "Starters", &[("Bruschetta", 750, false), ("Greek Salad", 1250, true)]),
  ("mains", "Mains", &[("Lemon Chicken", 1899, true), ("Grilled Fish", 2050, false)]),
  ("desserts", "Desserts", &[("Lemon Dessert", 599, true), ("Baklava", 450, false)]),
];

/// Inserts a small sample catalog when no categories exist yet.
#[instrument(name = "catalog_service::seed_catalog", skip_all, err(Display))]
pub async fn seed_catalog(store: &dyn Store) -> AppResult<usize> {
  if !store.list_categories().await?.is_empty() {
    info!("Catalog already populated; skipping seed.");
    return Ok(0);
  }

  let mut inserted = 0;
  for (slug, title, items) in SAMPLE_MENU {
    let category = store
      .create_category(NewCategory {
        slug: slug.to_string(),
        title: title.to_string(),
      })
      .await?;
    for (item_title, cents, featured) in items.iter() {
      store
        .create_menu_item(NewMenuItem {
          title: item_title.to_string(),
          price: Decimal::new(*cents, 2),
          featured: *featured,
          category_id: category.id,
        })
        .await?;
      inserted += 1;
    }
  }
  info!(inserted, "Sample catalog seeded.");
  Ok(inserted)
}
