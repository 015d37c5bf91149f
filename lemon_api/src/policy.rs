// lemon_api/src/policy.rs

//! Access decisions for every (actor, resource, action) triple.
//!
//! Reads of records the caller may not see are answered as if the record did
//! not exist; writes the caller may not perform are refused outright.

use tracing::debug;

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Order, OrderScope, Role, RoleSet, User};

pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action.";
pub const NOT_FOUND_MESSAGE: &str = "No Order matches the given query.";

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Actor {
  pub user_id: i64,
  pub username: String,
  pub email: String,
  pub is_superuser: bool,
  pub roles: RoleSet,
}

impl Actor {
  pub fn new(user: &User, roles: RoleSet) -> Self {
    Self {
      user_id: user.id,
      username: user.username.clone(),
      email: user.email.clone(),
      is_superuser: user.is_superuser,
      roles,
    }
  }

  /// Superusers satisfy every role check.
  pub fn has_role(&self, role: Role) -> bool {
    self.is_superuser || self.roles.contains(role)
  }

  pub fn is_manager(&self) -> bool {
    self.has_role(Role::Manager)
  }

  pub fn is_delivery_crew(&self) -> bool {
    self.has_role(Role::DeliveryCrew)
  }

  /// Holds neither role.
  pub fn is_customer(&self) -> bool {
    self.roles.is_empty()
  }
}

#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
  /// Menu items and categories.
  Catalog,
  Cart { owner_id: i64 },
  /// The order collection, for listing and placement.
  Orders,
  Order(&'a Order),
  Group(Role),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  List,
  View,
  Create,
  Replace,
  Update,
  Delete,
  SetStatus,
  AssignCrew,
}

impl Action {
  fn is_read(self) -> bool {
    matches!(self, Action::List | Action::View)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
  /// 403.
  Forbidden,
  /// 404, the record's existence is not revealed.
  Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Allow,
  Deny(Denial),
}

fn allow_if(condition: bool, denial: Denial) -> Decision {
  if condition {
    Decision::Allow
  } else {
    Decision::Deny(denial)
  }
}

pub fn authorize(actor: &Actor, resource: Resource<'_>, action: Action) -> Decision {
  match resource {
    Resource::Catalog => allow_if(action.is_read() || actor.is_manager(), Denial::Forbidden),
    Resource::Cart { owner_id } => allow_if(actor.user_id == owner_id, Denial::Forbidden),
    Resource::Orders => match action {
      Action::Create => allow_if(actor.is_customer() || actor.is_superuser, Denial::Forbidden),
      _ => Decision::Allow,
    },
    Resource::Order(order) => {
      let assigned = actor.is_delivery_crew() && order.is_assigned_to(actor.user_id);
      match action {
        Action::View | Action::List => {
          allow_if(actor.is_manager() || assigned || order.user_id == actor.user_id, Denial::Hidden)
        }
        Action::SetStatus => allow_if(actor.is_manager() || assigned, Denial::Forbidden),
        _ => allow_if(actor.is_manager(), Denial::Forbidden),
      }
    }
    Resource::Group(_) => allow_if(actor.is_manager(), Denial::Forbidden),
  }
}

/// `authorize`, turned into the error a handler should return.
pub fn enforce(actor: &Actor, resource: Resource<'_>, action: Action) -> AppResult<()> {
  match authorize(actor, resource, action) {
    Decision::Allow => Ok(()),
    Decision::Deny(denial) => {
      debug!(user_id = actor.user_id, ?resource, ?action, ?denial, "Access denied.");
      match denial {
        Denial::Forbidden => Err(AppError::Forbidden(FORBIDDEN_MESSAGE.to_string())),
        Denial::Hidden => Err(AppError::NotFound(NOT_FOUND_MESSAGE.to_string())),
      }
    }
  }
}

/// Which orders `GET /orders` returns for this actor.
pub fn order_scope(actor: &Actor) -> OrderScope {
  if actor.is_manager() {
    OrderScope::All
  } else if actor.is_delivery_crew() {
    OrderScope::AssignedTo(actor.user_id)
  } else {
    OrderScope::OwnedBy(actor.user_id)
  }
}
