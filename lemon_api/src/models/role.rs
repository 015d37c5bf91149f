// lemon_api/src/models/role.rs

use serde::Serialize;

/// A named permission group. Users in neither group are customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Role {
  Manager,
  DeliveryCrew,
}

impl Role {
  pub const ALL: [Role; 2] = [Role::Manager, Role::DeliveryCrew];

  /// Name stored in the membership table.
  pub fn group_name(self) -> &'static str {
    match self {
      Role::Manager => "Manager",
      Role::DeliveryCrew => "Delivery crew",
    }
  }

  pub fn from_group_name(name: &str) -> Option<Role> {
    Role::ALL.into_iter().find(|role| role.group_name() == name)
  }

  /// Lower-case name used in client-facing messages.
  pub fn display_name(self) -> &'static str {
    match self {
      Role::Manager => "manager",
      Role::DeliveryCrew => "delivery crew",
    }
  }
}

impl std::fmt::Display for Role {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.group_name())
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleSet {
  manager: bool,
  delivery_crew: bool,
}

impl RoleSet {
  pub fn contains(&self, role: Role) -> bool {
    match role {
      Role::Manager => self.manager,
      Role::DeliveryCrew => self.delivery_crew,
    }
  }

  pub fn insert(&mut self, role: Role) {
    match role {
      Role::Manager => self.manager = true,
      Role::DeliveryCrew => self.delivery_crew = true,
    }
  }

  pub fn is_empty(&self) -> bool {
    !self.manager && !self.delivery_crew
  }

  pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
    Role::ALL.into_iter().filter(move |role| self.contains(*role))
  }
}

impl FromIterator<Role> for RoleSet {
  fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
    let mut set = RoleSet::default();
    for role in iter {
      set.insert(role);
    }
    set
  }
}
