// lemon_api/src/store/mod.rs

//! Persistence boundary. Handlers and pipelines only talk to `dyn Store`;
//! `PgStore` backs production and `MemoryStore` backs tests and
//! `STORAGE_BACKEND=memory`.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
  CartItem, Category, MenuItemChanges, MenuItemFilter, MenuItemView, NewCartItem, NewCategory, NewMenuItem, NewUser,
  OrderChanges, OrderScope, OrderView, Role, RoleSet, User,
};

#[derive(Debug, Error)]
pub enum StoreError {
  /// A uniqueness constraint rejected the write.
  #[error("{0}")]
  Duplicate(String),

  #[error("cart is empty")]
  EmptyCart,

  /// The record is still referenced and cannot be removed.
  #[error("{0}")]
  InUse(String),

  /// A referenced record does not exist.
  #[error("{0}")]
  MissingReference(String),

  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
  // Users and roles.
  async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;
  async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>>;
  async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
  async fn user_roles(&self, user_id: i64) -> StoreResult<RoleSet>;
  async fn list_role_members(&self, role: Role) -> StoreResult<Vec<User>>;
  /// Returns `false` when the user already held the role.
  async fn add_role_member(&self, user_id: i64, role: Role) -> StoreResult<bool>;
  /// Returns `false` when the user did not hold the role.
  async fn remove_role_member(&self, user_id: i64, role: Role) -> StoreResult<bool>;

  // Tokens.
  async fn create_token(&self, user_id: i64, key: &str) -> StoreResult<()>;
  async fn find_user_by_token(&self, key: &str) -> StoreResult<Option<User>>;
  async fn delete_token(&self, key: &str) -> StoreResult<bool>;

  // Catalog.
  async fn list_categories(&self) -> StoreResult<Vec<Category>>;
  async fn find_category(&self, category_id: i64) -> StoreResult<Option<Category>>;
  async fn create_category(&self, new_category: NewCategory) -> StoreResult<Category>;
  async fn list_menu_items(&self, filter: &MenuItemFilter) -> StoreResult<Vec<MenuItemView>>;
  async fn find_menu_item(&self, menuitem_id: i64) -> StoreResult<Option<MenuItemView>>;
  async fn create_menu_item(&self, new_item: NewMenuItem) -> StoreResult<MenuItemView>;
  async fn update_menu_item(&self, menuitem_id: i64, changes: &MenuItemChanges) -> StoreResult<Option<MenuItemView>>;
  /// Fails with `InUse` while any order item references the menu item.
  /// Cart lines for it are removed along with it.
  async fn delete_menu_item(&self, menuitem_id: i64) -> StoreResult<bool>;

  // Cart.
  async fn list_cart(&self, user_id: i64) -> StoreResult<Vec<CartItem>>;
  /// Fails with `Duplicate` when the user already has a line for the menu item.
  async fn add_cart_item(&self, item: NewCartItem) -> StoreResult<CartItem>;
  async fn clear_cart(&self, user_id: i64) -> StoreResult<u64>;

  // Orders.
  /// Converts the user's whole cart into an order and empties the cart, all
  /// or nothing. Fails with `EmptyCart` when there is nothing to convert.
  async fn place_order(&self, user_id: i64, date: DateTime<Utc>) -> StoreResult<OrderView>;
  async fn list_orders(&self, scope: OrderScope) -> StoreResult<Vec<OrderView>>;
  async fn find_order(&self, order_id: i64) -> StoreResult<Option<OrderView>>;
  async fn update_order(&self, order_id: i64, changes: &OrderChanges) -> StoreResult<Option<OrderView>>;
  async fn delete_order(&self, order_id: i64) -> StoreResult<bool>;
}
