// lemon_api/src/web/handlers/menu_handlers.rs

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::{MenuItemChanges, MenuItemFilter, MenuOrdering, NewMenuItem};
use crate::policy::{self, Action, Resource};
use crate::services::catalog_service;
use crate::state::AppState;
use crate::web::AuthenticatedUser;

#[derive(Deserialize, Debug, Default)]
pub struct ListMenuItemsQuery {
  pub category: Option<String>,
  pub featured: Option<bool>,
  pub search: Option<String>,
  pub ordering: Option<String>,
  pub page: Option<u32>,
  pub perpage: Option<u32>,
}

impl ListMenuItemsQuery {
  /// Turns query parameters into a store filter, capping the page size.
  pub fn into_filter(self, max_page_size: u32) -> Result<MenuItemFilter, AppError> {
    let ordering = match self.ordering.as_deref() {
      None | Some("") => MenuOrdering::default(),
      Some(raw) => MenuOrdering::parse(raw)
        .ok_or_else(|| AppError::Validation(format!("Unsupported ordering '{}'.", raw)))?,
    };
    let perpage = self.perpage.unwrap_or(max_page_size).clamp(1, max_page_size);
    let page = self.page.unwrap_or(1);
    if page == 0 {
      return Err(AppError::Validation("Page numbers start at 1.".to_string()));
    }

    Ok(MenuItemFilter {
      category_slug: self.category.filter(|s| !s.is_empty()),
      featured: self.featured,
      search: self.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
      ordering,
      limit: Some(perpage),
      offset: (page - 1).saturating_mul(perpage),
    })
  }
}

#[derive(Deserialize, Debug)]
pub struct MenuItemPayload {
  pub title: String,
  pub price: Decimal,
  #[serde(default)]
  pub featured: bool,
  #[serde(alias = "category")]
  pub category_id: i64,
}

/// Body of `PUT /menu-items/{id}`. Every field is required.
#[derive(Deserialize, Debug)]
pub struct MenuItemReplacePayload {
  pub title: String,
  pub price: Decimal,
  pub featured: bool,
  #[serde(alias = "category")]
  pub category_id: i64,
}

impl From<MenuItemReplacePayload> for MenuItemPayload {
  fn from(payload: MenuItemReplacePayload) -> Self {
    Self {
      title: payload.title,
      price: payload.price,
      featured: payload.featured,
      category_id: payload.category_id,
    }
  }
}

#[derive(Deserialize, Debug, Default)]
pub struct MenuItemPatchPayload {
  pub title: Option<String>,
  pub price: Option<Decimal>,
  pub featured: Option<bool>,
  #[serde(alias = "category")]
  pub category_id: Option<i64>,
}

async fn validated_new_item(app_state: &AppState, payload: MenuItemPayload) -> Result<NewMenuItem, AppError> {
  let category = catalog_service::require_category(app_state.store.as_ref(), payload.category_id).await?;
  Ok(NewMenuItem {
    title: catalog_service::validate_title(&payload.title)?,
    price: catalog_service::validate_price(payload.price)?,
    featured: payload.featured,
    category_id: category.id,
  })
}

fn menu_item_not_found(menuitem_id: i64) -> AppError {
  AppError::NotFound(format!("Menu item {} not found.", menuitem_id))
}

#[instrument(name = "handler::list_menu_items", skip(app_state, auth_user))]
pub async fn list_menu_items_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<ListMenuItemsQuery>,
) -> Result<HttpResponse, AppError> {
  policy::enforce(&auth_user.actor, Resource::Catalog, Action::List)?;
  let filter = query.into_inner().into_filter(app_state.config.menu_max_page_size)?;
  let items = app_state.store.list_menu_items(&filter).await?;
  Ok(HttpResponse::Ok().json(items))
}

#[instrument(name = "handler::get_menu_item", skip(app_state, auth_user), fields(menuitem_id = %path.as_ref()))]
pub async fn get_menu_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  policy::enforce(&auth_user.actor, Resource::Catalog, Action::View)?;
  let menuitem_id = path.into_inner();
  let item = app_state
    .store
    .find_menu_item(menuitem_id)
    .await?
    .ok_or_else(|| menu_item_not_found(menuitem_id))?;
  Ok(HttpResponse::Ok().json(item))
}

#[instrument(name = "handler::create_menu_item", skip(app_state, payload, auth_user), fields(user_id = auth_user.actor.user_id))]
pub async fn create_menu_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: Result<web::Json<MenuItemPayload>, AppError>,
) -> Result<HttpResponse, AppError> {
  policy::enforce(&auth_user.actor, Resource::Catalog, Action::Create)?;
  let new_item = validated_new_item(&app_state, payload?.into_inner()).await?;
  let item = app_state.store.create_menu_item(new_item).await?;
  info!(menuitem_id = item.id, "Menu item created.");
  Ok(HttpResponse::Created().json(item))
}

#[instrument(
  name = "handler::replace_menu_item",
  skip(app_state, payload, auth_user),
  fields(menuitem_id = %path.as_ref(), user_id = auth_user.actor.user_id)
)]
pub async fn replace_menu_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
  payload: Result<web::Json<MenuItemReplacePayload>, AppError>,
) -> Result<HttpResponse, AppError> {
  policy::enforce(&auth_user.actor, Resource::Catalog, Action::Replace)?;
  let menuitem_id = path.into_inner();
  let replacement = validated_new_item(&app_state, payload?.into_inner().into()).await?;
  let changes = MenuItemChanges {
    title: Some(replacement.title),
    price: Some(replacement.price),
    featured: Some(replacement.featured),
    category_id: Some(replacement.category_id),
  };
  let item = app_state
    .store
    .update_menu_item(menuitem_id, &changes)
    .await?
    .ok_or_else(|| menu_item_not_found(menuitem_id))?;
  Ok(HttpResponse::Ok().json(item))
}

#[instrument(
  name = "handler::update_menu_item",
  skip(app_state, payload, auth_user),
  fields(menuitem_id = %path.as_ref(), user_id = auth_user.actor.user_id)
)]
pub async fn update_menu_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
  payload: Result<web::Json<MenuItemPatchPayload>, AppError>,
) -> Result<HttpResponse, AppError> {
  policy::enforce(&auth_user.actor, Resource::Catalog, Action::Update)?;
  let menuitem_id = path.into_inner();
  let patch = payload?.into_inner();

  let category_id = match patch.category_id {
    Some(id) => Some(catalog_service::require_category(app_state.store.as_ref(), id).await?.id),
    None => None,
  };
  let changes = MenuItemChanges {
    title: patch.title.as_deref().map(catalog_service::validate_title).transpose()?,
    price: patch.price.map(catalog_service::validate_price).transpose()?,
    featured: patch.featured,
    category_id,
  };

  let item = if changes.is_empty() {
    app_state.store.find_menu_item(menuitem_id).await?
  } else {
    app_state.store.update_menu_item(menuitem_id, &changes).await?
  };
  let item = item.ok_or_else(|| menu_item_not_found(menuitem_id))?;
  Ok(HttpResponse::Ok().json(item))
}

#[instrument(
  name = "handler::delete_menu_item",
  skip(app_state, auth_user),
  fields(menuitem_id = %path.as_ref(), user_id = auth_user.actor.user_id)
)]
pub async fn delete_menu_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  policy::enforce(&auth_user.actor, Resource::Catalog, Action::Delete)?;
  let menuitem_id = path.into_inner();
  if !app_state.store.delete_menu_item(menuitem_id).await? {
    warn!("Delete requested for a missing menu item.");
    return Err(menu_item_not_found(menuitem_id));
  }
  info!("Menu item deleted.");
  Ok(HttpResponse::NoContent().finish())
}
