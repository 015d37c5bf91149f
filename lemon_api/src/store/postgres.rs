// lemon_api/src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::{debug, error, info, instrument};

use super::{Store, StoreError, StoreResult};
use crate::models::{
  CartItem, Category, MenuItemChanges, MenuItemFilter, MenuItemView, NewCartItem, NewCategory, NewMenuItem, NewUser,
  Order, OrderChanges, OrderDraft, OrderItem, OrderScope, OrderView, Role, RoleSet, User,
};

const USER_COLUMNS: &str = "id, username, email, password_hash, is_superuser, date_joined";
const ORDER_COLUMNS: &str = "id, user_id, delivery_crew_id, status, total, date";
const ORDER_ITEM_COLUMNS: &str = "id, order_id, menuitem_id, quantity, unit_price, price";
const CART_COLUMNS: &str = "id, user_id, menuitem_id, quantity, unit_price, price";
const MENU_ITEM_SELECT: &str = "SELECT m.id, m.title, m.price, m.featured, m.category_id, \
   c.slug AS category_slug, c.title AS category_title \
   FROM menu_items m JOIN categories c ON c.id = m.category_id";

/// A menu item joined with its category.
#[derive(FromRow)]
struct MenuItemRow {
  id: i64,
  title: String,
  price: Decimal,
  featured: bool,
  category_id: i64,
  category_slug: String,
  category_title: String,
}

impl From<MenuItemRow> for MenuItemView {
  fn from(row: MenuItemRow) -> Self {
    MenuItemView {
      id: row.id,
      title: row.title,
      price: row.price,
      featured: row.featured,
      category: Category {
        id: row.category_id,
        slug: row.category_slug,
        title: row.category_title,
      },
    }
  }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
  err.as_database_error().is_some_and(|db_err| db_err.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
  err.as_database_error().is_some_and(|db_err| db_err.is_foreign_key_violation())
}

/// Escapes LIKE wildcards so a search term only matches literally.
fn escape_like(term: &str) -> String {
  let mut escaped = String::with_capacity(term.len());
  for ch in term.chars() {
    if matches!(ch, '%' | '_' | '\\') {
      escaped.push('\\');
    }
    escaped.push(ch);
  }
  escaped
}

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  #[instrument(name = "pg_store::connect", skip(database_url), err(Display))]
  pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await?;
    info!("Successfully connected to the database.");
    Ok(Self::new(pool))
  }

  #[instrument(name = "pg_store::migrate", skip(self), err(Display))]
  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!("Database migrations applied.");
    Ok(())
  }

  async fn items_for_orders(&self, order_ids: &[i64]) -> StoreResult<HashMap<i64, Vec<OrderItem>>> {
    let items: Vec<OrderItem> = sqlx::query_as(&format!(
      "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id"
    ))
    .bind(order_ids)
    .fetch_all(&self.pool)
    .await?;

    let mut grouped: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    for item in items {
      grouped.entry(item.order_id).or_default().push(item);
    }
    Ok(grouped)
  }

  async fn order_views(&self, orders: Vec<Order>) -> StoreResult<Vec<OrderView>> {
    let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let mut items = self.items_for_orders(&ids).await?;
    Ok(
      orders
        .into_iter()
        .map(|order| {
          let order_items = items.remove(&order.id).unwrap_or_default();
          OrderView::new(order, order_items)
        })
        .collect(),
    )
  }
}

#[async_trait]
impl Store for PgStore {
  async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
    sqlx::query_as(&format!(
      "INSERT INTO users (username, email, password_hash, is_superuser) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
    ))
    .bind(&new_user.username)
    .bind(&new_user.email)
    .bind(&new_user.password_hash)
    .bind(new_user.is_superuser)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| {
      if is_unique_violation(&e) {
        StoreError::Duplicate("A user with that username already exists.".to_string())
      } else {
        StoreError::Database(e)
      }
    })
  }

  async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>> {
    Ok(
      sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
    Ok(
      sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn user_roles(&self, user_id: i64) -> StoreResult<RoleSet> {
    let names: Vec<String> = sqlx::query_scalar("SELECT group_name FROM user_groups WHERE user_id = $1")
      .bind(user_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(names.iter().filter_map(|name| Role::from_group_name(name)).collect())
  }

  async fn list_role_members(&self, role: Role) -> StoreResult<Vec<User>> {
    Ok(
      sqlx::query_as(
        "SELECT u.id, u.username, u.email, u.password_hash, u.is_superuser, u.date_joined \
         FROM users u JOIN user_groups g ON g.user_id = u.id WHERE g.group_name = $1 ORDER BY u.id",
      )
      .bind(role.group_name())
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn add_role_member(&self, user_id: i64, role: Role) -> StoreResult<bool> {
    let result = sqlx::query("INSERT INTO user_groups (user_id, group_name) VALUES ($1, $2) ON CONFLICT DO NOTHING")
      .bind(user_id)
      .bind(role.group_name())
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn remove_role_member(&self, user_id: i64, role: Role) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM user_groups WHERE user_id = $1 AND group_name = $2")
      .bind(user_id)
      .bind(role.group_name())
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn create_token(&self, user_id: i64, key: &str) -> StoreResult<()> {
    sqlx::query("INSERT INTO auth_tokens (key, user_id) VALUES ($1, $2)")
      .bind(key)
      .bind(user_id)
      .execute(&self.pool)
      .await
      .map_err(|e| {
        if is_unique_violation(&e) {
          StoreError::Duplicate("Token key collision.".to_string())
        } else {
          StoreError::Database(e)
        }
      })?;
    Ok(())
  }

  async fn find_user_by_token(&self, key: &str) -> StoreResult<Option<User>> {
    Ok(
      sqlx::query_as(
        "SELECT u.id, u.username, u.email, u.password_hash, u.is_superuser, u.date_joined \
         FROM auth_tokens t JOIN users u ON u.id = t.user_id WHERE t.key = $1",
      )
      .bind(key)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn delete_token(&self, key: &str) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM auth_tokens WHERE key = $1")
      .bind(key)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn list_categories(&self) -> StoreResult<Vec<Category>> {
    Ok(
      sqlx::query_as("SELECT id, slug, title FROM categories ORDER BY id")
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn find_category(&self, category_id: i64) -> StoreResult<Option<Category>> {
    Ok(
      sqlx::query_as("SELECT id, slug, title FROM categories WHERE id = $1")
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn create_category(&self, new_category: NewCategory) -> StoreResult<Category> {
    sqlx::query_as("INSERT INTO categories (slug, title) VALUES ($1, $2) RETURNING id, slug, title")
      .bind(&new_category.slug)
      .bind(&new_category.title)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| {
        if is_unique_violation(&e) {
          StoreError::Duplicate("A category with that slug already exists.".to_string())
        } else {
          StoreError::Database(e)
        }
      })
  }

  #[instrument(name = "pg_store::list_menu_items", skip(self))]
  async fn list_menu_items(&self, filter: &MenuItemFilter) -> StoreResult<Vec<MenuItemView>> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(MENU_ITEM_SELECT);
    query.push(" WHERE TRUE");
    if let Some(slug) = &filter.category_slug {
      query.push(" AND c.slug = ").push_bind(slug.clone());
    }
    if let Some(featured) = filter.featured {
      query.push(" AND m.featured = ").push_bind(featured);
    }
    if let Some(search) = &filter.search {
      query
        .push(" AND m.title ILIKE ")
        .push_bind(format!("%{}%", escape_like(search)));
    }
    query.push(" ORDER BY ").push(filter.ordering.sql());
    if let Some(limit) = filter.limit {
      query.push(" LIMIT ").push_bind(i64::from(limit));
    }
    query.push(" OFFSET ").push_bind(i64::from(filter.offset));

    let rows: Vec<MenuItemRow> = query.build_query_as().fetch_all(&self.pool).await.map_err(|e| {
      error!(error = %e, "Failed to list menu items.");
      StoreError::Database(e)
    })?;
    debug!(count = rows.len(), "Listed menu items.");
    Ok(rows.into_iter().map(MenuItemView::from).collect())
  }

  async fn find_menu_item(&self, menuitem_id: i64) -> StoreResult<Option<MenuItemView>> {
    let row: Option<MenuItemRow> = sqlx::query_as(&format!("{MENU_ITEM_SELECT} WHERE m.id = $1"))
      .bind(menuitem_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(MenuItemView::from))
  }

  async fn create_menu_item(&self, new_item: NewMenuItem) -> StoreResult<MenuItemView> {
    let row: MenuItemRow = sqlx::query_as(
      "WITH m AS ( \
         INSERT INTO menu_items (title, price, featured, category_id) VALUES ($1, $2, $3, $4) \
         RETURNING id, title, price, featured, category_id \
       ) \
       SELECT m.id, m.title, m.price, m.featured, m.category_id, \
         c.slug AS category_slug, c.title AS category_title \
       FROM m JOIN categories c ON c.id = m.category_id",
    )
    .bind(&new_item.title)
    .bind(new_item.price)
    .bind(new_item.featured)
    .bind(new_item.category_id)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| {
      if is_foreign_key_violation(&e) {
        StoreError::MissingReference(format!("Category {} does not exist.", new_item.category_id))
      } else {
        StoreError::Database(e)
      }
    })?;
    Ok(row.into())
  }

  async fn update_menu_item(&self, menuitem_id: i64, changes: &MenuItemChanges) -> StoreResult<Option<MenuItemView>> {
    let result = sqlx::query(
      "UPDATE menu_items SET \
         title = COALESCE($2, title), \
         price = COALESCE($3, price), \
         featured = COALESCE($4, featured), \
         category_id = COALESCE($5, category_id) \
       WHERE id = $1",
    )
    .bind(menuitem_id)
    .bind(changes.title.as_deref())
    .bind(changes.price)
    .bind(changes.featured)
    .bind(changes.category_id)
    .execute(&self.pool)
    .await
    .map_err(|e| {
      if is_foreign_key_violation(&e) {
        StoreError::MissingReference("The selected category does not exist.".to_string())
      } else {
        StoreError::Database(e)
      }
    })?;
    if result.rows_affected() == 0 {
      return Ok(None);
    }
    self.find_menu_item(menuitem_id).await
  }

  #[instrument(name = "pg_store::delete_menu_item", skip(self))]
  async fn delete_menu_item(&self, menuitem_id: i64) -> StoreResult<bool> {
    // cart_items cascade; order_items restrict.
    let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
      .bind(menuitem_id)
      .execute(&self.pool)
      .await
      .map_err(|e| {
        if is_foreign_key_violation(&e) {
          StoreError::InUse("This menu item appears in existing orders and cannot be deleted.".to_string())
        } else {
          StoreError::Database(e)
        }
      })?;
    Ok(result.rows_affected() > 0)
  }

  async fn list_cart(&self, user_id: i64) -> StoreResult<Vec<CartItem>> {
    Ok(
      sqlx::query_as(&format!("SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 ORDER BY id"))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn add_cart_item(&self, item: NewCartItem) -> StoreResult<CartItem> {
    sqlx::query_as(&format!(
      "INSERT INTO cart_items (user_id, menuitem_id, quantity, unit_price, price) \
       VALUES ($1, $2, $3, $4, $5) RETURNING {CART_COLUMNS}"
    ))
    .bind(item.user_id)
    .bind(item.menuitem_id)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.price)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| {
      if is_unique_violation(&e) {
        StoreError::Duplicate("This menu item is already in your cart.".to_string())
      } else if is_foreign_key_violation(&e) {
        StoreError::MissingReference(format!("Menu item {} does not exist.", item.menuitem_id))
      } else {
        StoreError::Database(e)
      }
    })
  }

  async fn clear_cart(&self, user_id: i64) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected())
  }

  #[instrument(name = "pg_store::place_order", skip(self, date))]
  async fn place_order(&self, user_id: i64, date: DateTime<Utc>) -> StoreResult<OrderView> {
    let mut tx = self.pool.begin().await?;

    // Row locks make a concurrent second placement wait, then see an empty cart.
    let cart: Vec<CartItem> = sqlx::query_as(&format!(
      "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 ORDER BY id FOR UPDATE"
    ))
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;

    let draft = OrderDraft::from_cart(user_id, &cart, date).ok_or(StoreError::EmptyCart)?;

    let order: Order = sqlx::query_as(&format!(
      "INSERT INTO orders (user_id, status, total, date) VALUES ($1, FALSE, $2, $3) RETURNING {ORDER_COLUMNS}"
    ))
    .bind(draft.user_id)
    .bind(draft.total)
    .bind(draft.date)
    .fetch_one(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(draft.items.len());
    for item in &draft.items {
      let order_item: OrderItem = sqlx::query_as(&format!(
        "INSERT INTO order_items (order_id, menuitem_id, quantity, unit_price, price) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {ORDER_ITEM_COLUMNS}"
      ))
      .bind(order.id)
      .bind(item.menuitem_id)
      .bind(item.quantity)
      .bind(item.unit_price)
      .bind(item.price)
      .fetch_one(&mut *tx)
      .await?;
      items.push(order_item);
    }

    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
      .bind(user_id)
      .execute(&mut *tx)
      .await?;

    tx.commit().await?;
    debug!(order_id = order.id, item_count = items.len(), "Cart converted to order.");
    Ok(OrderView::new(order, items))
  }

  async fn list_orders(&self, scope: OrderScope) -> StoreResult<Vec<OrderView>> {
    let orders: Vec<Order> = match scope {
      OrderScope::All => {
        sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id"))
          .fetch_all(&self.pool)
          .await?
      }
      OrderScope::AssignedTo(crew_id) => {
        sqlx::query_as(&format!(
          "SELECT {ORDER_COLUMNS} FROM orders WHERE delivery_crew_id = $1 ORDER BY id"
        ))
        .bind(crew_id)
        .fetch_all(&self.pool)
        .await?
      }
      OrderScope::OwnedBy(user_id) => {
        sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY id"))
          .bind(user_id)
          .fetch_all(&self.pool)
          .await?
      }
    };
    self.order_views(orders).await
  }

  async fn find_order(&self, order_id: i64) -> StoreResult<Option<OrderView>> {
    let order: Option<Order> = sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await?;
    match order {
      Some(order) => Ok(self.order_views(vec![order]).await?.pop()),
      None => Ok(None),
    }
  }

  async fn update_order(&self, order_id: i64, changes: &OrderChanges) -> StoreResult<Option<OrderView>> {
    // $3 says whether delivery_crew_id was supplied at all, since NULL is a valid new value.
    let (crew_supplied, crew_id) = match changes.delivery_crew_id {
      Some(crew_id) => (true, crew_id),
      None => (false, None),
    };
    let order: Option<Order> = sqlx::query_as(&format!(
      "UPDATE orders SET \
         status = COALESCE($2, status), \
         delivery_crew_id = CASE WHEN $3 THEN $4 ELSE delivery_crew_id END \
       WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(changes.status)
    .bind(crew_supplied)
    .bind(crew_id)
    .fetch_optional(&self.pool)
    .await
    .map_err(|e| {
      if is_foreign_key_violation(&e) {
        StoreError::MissingReference("The selected delivery crew member does not exist.".to_string())
      } else {
        StoreError::Database(e)
      }
    })?;
    match order {
      Some(order) => Ok(self.order_views(vec![order]).await?.pop()),
      None => Ok(None),
    }
  }

  async fn delete_order(&self, order_id: i64) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
      .bind(order_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }
}
