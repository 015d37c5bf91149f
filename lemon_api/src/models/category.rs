// lemon_api/src/models/category.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
  pub id: i64,
  pub slug: String,
  pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
  pub slug: String,
  pub title: String,
}
