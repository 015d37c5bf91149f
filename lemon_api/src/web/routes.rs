// lemon_api/src/web/routes.rs

use actix_web::{web, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::{cart_handlers, category_handlers, group_handlers, menu_handlers, order_handlers, user_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

fn json_config() -> web::JsonConfig {
  web::JsonConfig::default()
    .error_handler(|err, _req| AppError::Validation(format!("Invalid request body: {}", err)).into())
}

fn query_config() -> web::QueryConfig {
  web::QueryConfig::default()
    .error_handler(|err, _req| AppError::Validation(format!("Invalid query string: {}", err)).into())
}

fn path_config() -> web::PathConfig {
  web::PathConfig::default().error_handler(|_err, _req| AppError::NotFound("Not found.".to_string()).into())
}

/// Mounts the whole API under `/api`.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api")
      .app_data(json_config())
      .app_data(query_config())
      .app_data(path_config())
      .route("/health", web::get().to(health_check_handler))
      // Identity
      .route("/users", web::post().to(user_handlers::register_handler))
      .route("/users/me", web::get().to(user_handlers::me_handler))
      .route("/token/login", web::post().to(user_handlers::login_handler))
      .route("/token/logout", web::post().to(user_handlers::logout_handler))
      // Group membership
      .service(
        web::resource("/groups/{group}/users")
          .route(web::get().to(group_handlers::list_members_handler))
          .route(web::post().to(group_handlers::add_member_handler)),
      )
      .route(
        "/groups/{group}/users/{user_id}",
        web::delete().to(group_handlers::remove_member_handler),
      )
      // Catalog
      .service(
        web::resource("/categories")
          .route(web::get().to(category_handlers::list_categories_handler))
          .route(web::post().to(category_handlers::create_category_handler)),
      )
      .service(
        web::resource("/menu-items")
          .route(web::get().to(menu_handlers::list_menu_items_handler))
          .route(web::post().to(menu_handlers::create_menu_item_handler)),
      )
      .service(
        web::resource("/menu-items/{menuitem_id}")
          .route(web::get().to(menu_handlers::get_menu_item_handler))
          .route(web::put().to(menu_handlers::replace_menu_item_handler))
          .route(web::patch().to(menu_handlers::update_menu_item_handler))
          .route(web::delete().to(menu_handlers::delete_menu_item_handler)),
      )
      // Cart
      .service(
        web::resource("/cart/menu-items")
          .route(web::get().to(cart_handlers::list_cart_handler))
          .route(web::post().to(cart_handlers::add_to_cart_handler))
          .route(web::delete().to(cart_handlers::clear_cart_handler)),
      )
      // Orders
      .service(
        web::resource("/orders")
          .route(web::get().to(order_handlers::list_orders_handler))
          .route(web::post().to(order_handlers::place_order_handler)),
      )
      .service(
        web::resource("/orders/{order_id}")
          .route(web::get().to(order_handlers::get_order_handler))
          .route(web::patch().to(order_handlers::update_order_handler))
          .route(web::delete().to(order_handlers::delete_order_handler)),
      ),
  );
}
