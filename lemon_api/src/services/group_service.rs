// lemon_api/src/services/group_service.rs

//! Promotion into and demotion out of the Manager and Delivery crew groups.

use tracing::{info, instrument};

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Role, User};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
  Added,
  AlreadyMember,
  Removed,
  NotMember,
}

#[derive(Debug, Clone)]
pub struct MembershipOutcome {
  pub user: User,
  pub role: Role,
  pub change: MembershipChange,
}

impl MembershipOutcome {
  /// Client-facing notice describing what happened.
  pub fn message(&self) -> String {
    let name = &self.user.username;
    let role = self.role.display_name();
    match self.change {
      MembershipChange::Added => format!("You promoted <{}> to {}.", name, with_article(self.role)),
      MembershipChange::AlreadyMember => format!("The user <{}> is already {}.", name, with_article(self.role)),
      MembershipChange::Removed => format!("<{}> is demoted. No longer {}.", name, role),
      MembershipChange::NotMember => format!("<{}> is not {}.", name, with_article(self.role)),
    }
  }
}

fn with_article(role: Role) -> String {
  match role {
    Role::Manager => "a manager".to_string(),
    Role::DeliveryCrew => "a delivery crew member".to_string(),
  }
}

#[instrument(name = "group_service::add_member", skip(store))]
pub async fn add_member(store: &dyn Store, role: Role, username: &str) -> AppResult<MembershipOutcome> {
  let user = store
    .find_user_by_username(username)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User with username '{}' not found.", username)))?;

  let change = if store.add_role_member(user.id, role).await? {
    info!(user_id = user.id, %role, "User promoted.");
    MembershipChange::Added
  } else {
    MembershipChange::AlreadyMember
  };
  Ok(MembershipOutcome { user, role, change })
}

#[instrument(name = "group_service::remove_member", skip(store))]
pub async fn remove_member(store: &dyn Store, role: Role, user_id: i64) -> AppResult<MembershipOutcome> {
  let user = store
    .find_user(user_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User with id {} not found.", user_id)))?;

  let change = if store.remove_role_member(user.id, role).await? {
    info!(user_id = user.id, %role, "User demoted.");
    MembershipChange::Removed
  } else {
    MembershipChange::NotMember
  };
  Ok(MembershipOutcome { user, role, change })
}
