// lemon_api/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: i64,
  pub username: String,
  pub email: String,
  #[serde(skip_serializing)] // Never send password hash to client
  pub password_hash: String,
  pub is_superuser: bool,
  pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
  pub username: String,
  pub email: String,
  pub password_hash: String,
  pub is_superuser: bool,
}

/// Public view of a user, as listed by the group admin endpoints.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserSummary {
  pub id: i64,
  pub username: String,
  pub email: String,
}

impl From<&User> for UserSummary {
  fn from(user: &User) -> Self {
    Self {
      id: user.id,
      username: user.username.clone(),
      email: user.email.clone(),
    }
  }
}
