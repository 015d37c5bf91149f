// lemon_api/src/store/memory.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, instrument};

use super::{Store, StoreError, StoreResult};
use crate::models::{
  CartItem, Category, MenuItem, MenuItemChanges, MenuItemFilter, MenuItemView, MenuOrdering, NewCartItem, NewCategory,
  NewMenuItem, NewUser, Order, OrderChanges, OrderDraft, OrderItem, OrderScope, OrderView, Role, RoleSet, User,
};

#[derive(Default)]
struct Tables {
  next_id: i64,
  users: BTreeMap<i64, User>,
  memberships: BTreeSet<(i64, Role)>,
  tokens: HashMap<String, i64>,
  categories: BTreeMap<i64, Category>,
  menu_items: BTreeMap<i64, MenuItem>,
  cart_items: BTreeMap<i64, CartItem>,
  orders: BTreeMap<i64, Order>,
  order_items: BTreeMap<i64, OrderItem>,
}

impl Tables {
  fn allocate_id(&mut self) -> i64 {
    self.next_id += 1;
    self.next_id
  }

  fn menu_item_view(&self, item: &MenuItem) -> Option<MenuItemView> {
    let category = self.categories.get(&item.category_id)?.clone();
    Some(MenuItemView::new(item.clone(), category))
  }

  fn order_view(&self, order: &Order) -> OrderView {
    let items = self
      .order_items
      .values()
      .filter(|item| item.order_id == order.id)
      .cloned()
      .collect();
    OrderView::new(order.clone(), items)
  }
}

/// In-process store. Every operation takes the single table lock, so each one
/// is atomic with respect to the others.
#[derive(Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
    let mut tables = self.tables.write();
    if tables.users.values().any(|u| u.username == new_user.username) {
      return Err(StoreError::Duplicate("A user with that username already exists.".to_string()));
    }
    let id = tables.allocate_id();
    let user = User {
      id,
      username: new_user.username,
      email: new_user.email,
      password_hash: new_user.password_hash,
      is_superuser: new_user.is_superuser,
      date_joined: Utc::now(),
    };
    tables.users.insert(id, user.clone());
    Ok(user)
  }

  async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>> {
    Ok(self.tables.read().users.get(&user_id).cloned())
  }

  async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
    Ok(self.tables.read().users.values().find(|u| u.username == username).cloned())
  }

  async fn user_roles(&self, user_id: i64) -> StoreResult<RoleSet> {
    let tables = self.tables.read();
    Ok(Role::ALL.into_iter().filter(|role| tables.memberships.contains(&(user_id, *role))).collect())
  }

  async fn list_role_members(&self, role: Role) -> StoreResult<Vec<User>> {
    let tables = self.tables.read();
    Ok(
      tables
        .memberships
        .iter()
        .filter(|(_, r)| *r == role)
        .filter_map(|(user_id, _)| tables.users.get(user_id).cloned())
        .collect(),
    )
  }

  async fn add_role_member(&self, user_id: i64, role: Role) -> StoreResult<bool> {
    Ok(self.tables.write().memberships.insert((user_id, role)))
  }

  async fn remove_role_member(&self, user_id: i64, role: Role) -> StoreResult<bool> {
    Ok(self.tables.write().memberships.remove(&(user_id, role)))
  }

  async fn create_token(&self, user_id: i64, key: &str) -> StoreResult<()> {
    let mut tables = self.tables.write();
    if tables.tokens.contains_key(key) {
      return Err(StoreError::Duplicate("Token key collision.".to_string()));
    }
    tables.tokens.insert(key.to_string(), user_id);
    Ok(())
  }

  async fn find_user_by_token(&self, key: &str) -> StoreResult<Option<User>> {
    let tables = self.tables.read();
    Ok(tables.tokens.get(key).and_then(|user_id| tables.users.get(user_id)).cloned())
  }

  async fn delete_token(&self, key: &str) -> StoreResult<bool> {
    Ok(self.tables.write().tokens.remove(key).is_some())
  }

  async fn list_categories(&self) -> StoreResult<Vec<Category>> {
    Ok(self.tables.read().categories.values().cloned().collect())
  }

  async fn find_category(&self, category_id: i64) -> StoreResult<Option<Category>> {
    Ok(self.tables.read().categories.get(&category_id).cloned())
  }

  async fn create_category(&self, new_category: NewCategory) -> StoreResult<Category> {
    let mut tables = self.tables.write();
    if tables.categories.values().any(|c| c.slug == new_category.slug) {
      return Err(StoreError::Duplicate("A category with that slug already exists.".to_string()));
    }
    let id = tables.allocate_id();
    let category = Category {
      id,
      slug: new_category.slug,
      title: new_category.title,
    };
    tables.categories.insert(id, category.clone());
    Ok(category)
  }

  #[instrument(name = "memory_store::list_menu_items", skip(self))]
  async fn list_menu_items(&self, filter: &MenuItemFilter) -> StoreResult<Vec<MenuItemView>> {
    let tables = self.tables.read();
    let needle = filter.search.as_ref().map(|s| s.to_lowercase());
    let mut views: Vec<MenuItemView> = tables
      .menu_items
      .values()
      .filter_map(|item| tables.menu_item_view(item))
      .filter(|view| {
        filter.category_slug.as_ref().map_or(true, |slug| &view.category.slug == slug)
          && filter.featured.map_or(true, |featured| view.featured == featured)
          && needle.as_ref().map_or(true, |n| view.title.to_lowercase().contains(n.as_str()))
      })
      .collect();

    match filter.ordering {
      MenuOrdering::Id => {}
      MenuOrdering::TitleAsc => views.sort_by(|a, b| a.title.cmp(&b.title)),
      MenuOrdering::TitleDesc => views.sort_by(|a, b| b.title.cmp(&a.title)),
      MenuOrdering::PriceAsc => views.sort_by(|a, b| a.price.cmp(&b.price)),
      MenuOrdering::PriceDesc => views.sort_by(|a, b| b.price.cmp(&a.price)),
    }

    let page = views.into_iter().skip(filter.offset as usize);
    let page: Vec<MenuItemView> = match filter.limit {
      Some(limit) => page.take(limit as usize).collect(),
      None => page.collect(),
    };
    debug!(count = page.len(), "Listed menu items.");
    Ok(page)
  }

  async fn find_menu_item(&self, menuitem_id: i64) -> StoreResult<Option<MenuItemView>> {
    let tables = self.tables.read();
    Ok(tables.menu_items.get(&menuitem_id).and_then(|item| tables.menu_item_view(item)))
  }

  async fn create_menu_item(&self, new_item: NewMenuItem) -> StoreResult<MenuItemView> {
    let mut tables = self.tables.write();
    let category = tables
      .categories
      .get(&new_item.category_id)
      .cloned()
      .ok_or_else(|| StoreError::MissingReference(format!("Category {} does not exist.", new_item.category_id)))?;
    let id = tables.allocate_id();
    let item = MenuItem {
      id,
      title: new_item.title,
      price: new_item.price,
      featured: new_item.featured,
      category_id: new_item.category_id,
    };
    tables.menu_items.insert(id, item.clone());
    Ok(MenuItemView::new(item, category))
  }

  async fn update_menu_item(&self, menuitem_id: i64, changes: &MenuItemChanges) -> StoreResult<Option<MenuItemView>> {
    let mut tables = self.tables.write();
    let Some(mut item) = tables.menu_items.get(&menuitem_id).cloned() else {
      return Ok(None);
    };
    if let Some(category_id) = changes.category_id {
      if !tables.categories.contains_key(&category_id) {
        return Err(StoreError::MissingReference(format!("Category {} does not exist.", category_id)));
      }
    }
    changes.apply_to(&mut item);
    let view = tables.menu_item_view(&item);
    tables.menu_items.insert(menuitem_id, item);
    Ok(view)
  }

  async fn delete_menu_item(&self, menuitem_id: i64) -> StoreResult<bool> {
    let mut tables = self.tables.write();
    if !tables.menu_items.contains_key(&menuitem_id) {
      return Ok(false);
    }
    if tables.order_items.values().any(|item| item.menuitem_id == menuitem_id) {
      return Err(StoreError::InUse(
        "This menu item appears in existing orders and cannot be deleted.".to_string(),
      ));
    }
    tables.cart_items.retain(|_, line| line.menuitem_id != menuitem_id);
    tables.menu_items.remove(&menuitem_id);
    Ok(true)
  }

  async fn list_cart(&self, user_id: i64) -> StoreResult<Vec<CartItem>> {
    Ok(
      self
        .tables
        .read()
        .cart_items
        .values()
        .filter(|line| line.user_id == user_id)
        .cloned()
        .collect(),
    )
  }

  async fn add_cart_item(&self, item: NewCartItem) -> StoreResult<CartItem> {
    let mut tables = self.tables.write();
    if !tables.menu_items.contains_key(&item.menuitem_id) {
      return Err(StoreError::MissingReference(format!(
        "Menu item {} does not exist.",
        item.menuitem_id
      )));
    }
    if tables
      .cart_items
      .values()
      .any(|line| line.user_id == item.user_id && line.menuitem_id == item.menuitem_id)
    {
      return Err(StoreError::Duplicate("This menu item is already in your cart.".to_string()));
    }
    let id = tables.allocate_id();
    let line = CartItem {
      id,
      user_id: item.user_id,
      menuitem_id: item.menuitem_id,
      quantity: item.quantity,
      unit_price: item.unit_price,
      price: item.price,
    };
    tables.cart_items.insert(id, line.clone());
    Ok(line)
  }

  async fn clear_cart(&self, user_id: i64) -> StoreResult<u64> {
    let mut tables = self.tables.write();
    let before = tables.cart_items.len();
    tables.cart_items.retain(|_, line| line.user_id != user_id);
    Ok((before - tables.cart_items.len()) as u64)
  }

  #[instrument(name = "memory_store::place_order", skip(self, date))]
  async fn place_order(&self, user_id: i64, date: DateTime<Utc>) -> StoreResult<OrderView> {
    // One write guard spans the read of the cart and every write below.
    let mut tables = self.tables.write();
    let cart: Vec<CartItem> = tables.cart_items.values().filter(|line| line.user_id == user_id).cloned().collect();
    let draft = OrderDraft::from_cart(user_id, &cart, date).ok_or(StoreError::EmptyCart)?;

    let order_id = tables.allocate_id();
    let order = Order {
      id: order_id,
      user_id,
      delivery_crew_id: None,
      status: false,
      total: draft.total,
      date: draft.date,
    };
    let mut items = Vec::with_capacity(draft.items.len());
    for item in draft.items {
      let id = tables.allocate_id();
      let order_item = OrderItem {
        id,
        order_id,
        menuitem_id: item.menuitem_id,
        quantity: item.quantity,
        unit_price: item.unit_price,
        price: item.price,
      };
      tables.order_items.insert(id, order_item.clone());
      items.push(order_item);
    }
    tables.orders.insert(order_id, order.clone());
    tables.cart_items.retain(|_, line| line.user_id != user_id);
    debug!(order_id, item_count = items.len(), "Cart converted to order.");
    Ok(OrderView::new(order, items))
  }

  async fn list_orders(&self, scope: OrderScope) -> StoreResult<Vec<OrderView>> {
    let tables = self.tables.read();
    Ok(
      tables
        .orders
        .values()
        .filter(|order| scope.includes(order))
        .map(|order| tables.order_view(order))
        .collect(),
    )
  }

  async fn find_order(&self, order_id: i64) -> StoreResult<Option<OrderView>> {
    let tables = self.tables.read();
    Ok(tables.orders.get(&order_id).map(|order| tables.order_view(order)))
  }

  async fn update_order(&self, order_id: i64, changes: &OrderChanges) -> StoreResult<Option<OrderView>> {
    let mut tables = self.tables.write();
    let Some(order) = tables.orders.get_mut(&order_id) else {
      return Ok(None);
    };
    order.apply(changes);
    let order = order.clone();
    Ok(Some(tables.order_view(&order)))
  }

  async fn delete_order(&self, order_id: i64) -> StoreResult<bool> {
    let mut tables = self.tables.write();
    if tables.orders.remove(&order_id).is_none() {
      return Ok(false);
    }
    tables.order_items.retain(|_, item| item.order_id != order_id);
    Ok(true)
  }
}
