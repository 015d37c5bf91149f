// lemon_api/tests/api_tests.rs

use actix_web::http::StatusCode;
use actix_web::middleware::NormalizePath;
use actix_web::{test, web, App};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;

use lemon_api::config::AppConfig;
use lemon_api::models::{MenuItemFilter, NewCategory, NewMenuItem, NewUser, OrderScope, Role};
use lemon_api::store::MemoryStore;
use lemon_api::web::configure_app_routes;
use lemon_api::AppState;

static TRACING: Lazy<()> = Lazy::new(|| {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
});

fn test_state() -> AppState {
  Lazy::force(&TRACING);
  AppState::new(Arc::new(MemoryStore::new()), AppConfig::default())
}

macro_rules! spawn_app {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($state.clone()))
        .wrap(NormalizePath::trim())
        .configure(configure_app_routes),
    )
    .await
  };
}

/// Sends a request and returns the status with the decoded JSON body (`Null` when empty).
macro_rules! call {
  ($app:expr, $req:expr) => {{
    let resp = test::call_service(&$app, $req.to_request()).await;
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    let body: Value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
  }};
}

fn authed(req: test::TestRequest, token: &str) -> test::TestRequest {
  req.insert_header(("Authorization", format!("Token {}", token)))
}

/// Creates a user with the given roles and a known token.
async fn add_user(state: &AppState, username: &str, roles: &[Role], is_superuser: bool) -> (i64, String) {
  let user = state
    .store
    .create_user(NewUser {
      username: username.to_string(),
      email: format!("{}@littlelemon.test", username),
      password_hash: "not-a-real-hash".to_string(),
      is_superuser,
    })
    .await
    .unwrap();
  for role in roles {
    state.store.add_role_member(user.id, *role).await.unwrap();
  }
  let token = format!("token-{}", username);
  state.store.create_token(user.id, &token).await.unwrap();
  (user.id, token)
}

async fn add_menu_item(state: &AppState, title: &str, price: Decimal) -> i64 {
  let category_id = match state.store.list_categories().await.unwrap().first() {
    Some(category) => category.id,
    None => {
      state
        .store
        .create_category(NewCategory {
          slug: "mains".to_string(),
          title: "Mains".to_string(),
        })
        .await
        .unwrap()
        .id
    }
  };
  state
    .store
    .create_menu_item(NewMenuItem {
      title: title.to_string(),
      price,
      featured: false,
      category_id,
    })
    .await
    .unwrap()
    .id
}

fn add_to_cart(token: &str, menuitem: i64, quantity: i32) -> test::TestRequest {
  authed(test::TestRequest::post().uri("/api/cart/menu-items"), token)
    .set_json(json!({ "menuitem": menuitem, "quantity": quantity }))
}

#[actix_web::test]
async fn health_is_public() {
  let state = test_state();
  let app = spawn_app!(state);
  let (status, body) = call!(app, test::TestRequest::get().uri("/api/health"));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn requests_without_a_valid_token_are_unauthorized() {
  let state = test_state();
  let app = spawn_app!(state);

  let (status, body) = call!(app, test::TestRequest::get().uri("/api/menu-items"));
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body["message"].is_string());

  let (status, _) = call!(app, authed(test::TestRequest::get().uri("/api/orders"), "bogus"));
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = call!(
    app,
    test::TestRequest::get()
      .uri("/api/cart/menu-items")
      .insert_header(("Authorization", "Bearer something"))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn register_login_me_and_logout() {
  let state = test_state();
  let app = spawn_app!(state);

  let (status, body) = call!(
    app,
    test::TestRequest::post()
      .uri("/api/users/")
      .set_json(json!({ "username": "tilly", "email": "tilly@littlelemon.test", "password": "lemon-secret" }))
  );
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["username"], "tilly");
  assert!(body["id"].is_i64());
  assert!(body.get("password").is_none());
  assert!(body.get("password_hash").is_none());

  let (status, _) = call!(
    app,
    test::TestRequest::post()
      .uri("/api/users")
      .set_json(json!({ "username": "tilly", "password": "another-secret" }))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call!(
    app,
    test::TestRequest::post()
      .uri("/api/users")
      .set_json(json!({ "username": "short", "password": "123" }))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = call!(
    app,
    test::TestRequest::post()
      .uri("/api/token/login")
      .set_json(json!({ "username": "tilly", "password": "wrong-password" }))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "Unable to log in with provided credentials.");

  let (status, body) = call!(
    app,
    test::TestRequest::post()
      .uri("/api/token/login")
      .set_json(json!({ "username": "tilly", "password": "lemon-secret" }))
  );
  assert_eq!(status, StatusCode::OK);
  let token = body["auth_token"].as_str().unwrap().to_string();

  let (status, body) = call!(app, authed(test::TestRequest::get().uri("/api/users/me"), &token));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "username": "tilly", "email": "tilly@littlelemon.test" }));

  let (status, _) = call!(app, authed(test::TestRequest::post().uri("/api/token/logout"), &token));
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) = call!(app, authed(test::TestRequest::get().uri("/api/users/me"), &token));
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn duplicate_cart_add_is_rejected() {
  let state = test_state();
  let app = spawn_app!(state);
  let (_, token) = add_user(&state, "ana", &[], false).await;
  let pasta = add_menu_item(&state, "Pasta", dec!(9.99)).await;

  let (status, body) = call!(app, add_to_cart(&token, pasta, 2));
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["unit_price"], "9.99");
  assert_eq!(body["price"], "19.98");

  let (status, body) = call!(app, add_to_cart(&token, pasta, 1));
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["message"].as_str().unwrap().contains("No duplicates allowed"));

  let (status, body) = call!(app, authed(test::TestRequest::get().uri("/api/cart/menu-items"), &token));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(body[0]["quantity"], 2);
}

#[actix_web::test]
async fn cart_rejects_bad_quantities_and_unknown_items() {
  let state = test_state();
  let app = spawn_app!(state);
  let (user_id, token) = add_user(&state, "ana", &[], false).await;
  let pasta = add_menu_item(&state, "Pasta", dec!(9.99)).await;

  let (status, _) = call!(app, add_to_cart(&token, pasta, 0));
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = call!(app, add_to_cart(&token, pasta, -3));
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = call!(app, add_to_cart(&token, 9_999, 1));
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call!(app, add_to_cart(&token, pasta, 1));
  assert_eq!(status, StatusCode::CREATED);
  let (status, _) = call!(app, authed(test::TestRequest::delete().uri("/api/cart/menu-items"), &token));
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call!(app, authed(test::TestRequest::delete().uri("/api/cart/menu-items"), &token));
  assert_eq!(status, StatusCode::NO_CONTENT);
  assert!(state.store.list_cart(user_id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn placing_an_order_snapshots_the_cart() {
  let state = test_state();
  let app = spawn_app!(state);
  let (user_id, token) = add_user(&state, "ana", &[], false).await;
  let pasta = add_menu_item(&state, "Pasta", dec!(9.99)).await;
  let salad = add_menu_item(&state, "Salad", dec!(4.50)).await;

  call!(app, add_to_cart(&token, pasta, 2));
  call!(app, add_to_cart(&token, salad, 1));

  let (status, body) = call!(app, authed(test::TestRequest::post().uri("/api/orders"), &token));
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["total"], "24.48");
  assert_eq!(body["user"], user_id);
  assert_eq!(body["status"], false);
  assert_eq!(body["delivery_crew"], Value::Null);
  assert_eq!(body["stage"], "placed");

  let items = body["order_items"].as_array().unwrap();
  assert_eq!(items.len(), 2);
  let pasta_line = items.iter().find(|i| i["menuitem"] == pasta).unwrap();
  assert_eq!(pasta_line["quantity"], 2);
  assert_eq!(pasta_line["unit_price"], "9.99");
  assert_eq!(pasta_line["price"], "19.98");

  assert!(state.store.list_cart(user_id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn empty_cart_cannot_be_ordered() {
  let state = test_state();
  let app = spawn_app!(state);
  let (_, token) = add_user(&state, "ana", &[], false).await;

  let (status, body) = call!(app, authed(test::TestRequest::post().uri("/api/orders"), &token));
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["message"].as_str().unwrap().contains("empty"));
  assert!(state.store.list_orders(OrderScope::All).await.unwrap().is_empty());
}

#[actix_web::test]
async fn only_customers_and_superusers_place_orders() {
  let state = test_state();
  let app = spawn_app!(state);
  let (_, manager) = add_user(&state, "mario", &[Role::Manager], false).await;
  let (_, crew) = add_user(&state, "dino", &[Role::DeliveryCrew], false).await;
  let (_, admin) = add_user(&state, "admin", &[], true).await;
  let pasta = add_menu_item(&state, "Pasta", dec!(9.99)).await;

  for token in [&manager, &crew] {
    call!(app, add_to_cart(token, pasta, 1));
    let (status, _) = call!(app, authed(test::TestRequest::post().uri("/api/orders"), token));
    assert_eq!(status, StatusCode::FORBIDDEN);
  }

  call!(app, add_to_cart(&admin, pasta, 1));
  let (status, _) = call!(app, authed(test::TestRequest::post().uri("/api/orders"), &admin));
  assert_eq!(status, StatusCode::CREATED);
}

#[actix_web::test]
async fn orders_are_scoped_by_role() {
  let state = test_state();
  let app = spawn_app!(state);
  let (_, ana) = add_user(&state, "ana", &[], false).await;
  let (_, ben) = add_user(&state, "ben", &[], false).await;
  let (_, manager) = add_user(&state, "mario", &[Role::Manager], false).await;
  let (crew_id, crew) = add_user(&state, "dino", &[Role::DeliveryCrew], false).await;
  let pasta = add_menu_item(&state, "Pasta", dec!(9.99)).await;
  let soup = add_menu_item(&state, "Soup", dec!(5.00)).await;

  call!(app, add_to_cart(&ana, pasta, 1));
  let (_, first) = call!(app, authed(test::TestRequest::post().uri("/api/orders"), &ana));
  call!(app, add_to_cart(&ana, soup, 1));
  call!(app, authed(test::TestRequest::post().uri("/api/orders"), &ana));
  call!(app, add_to_cart(&ben, soup, 3));
  call!(app, authed(test::TestRequest::post().uri("/api/orders"), &ben));

  let (_, body) = call!(app, authed(test::TestRequest::get().uri("/api/orders"), &ana));
  assert_eq!(body.as_array().unwrap().len(), 2);
  let (_, body) = call!(app, authed(test::TestRequest::get().uri("/api/orders"), &ben));
  assert_eq!(body.as_array().unwrap().len(), 1);
  let (_, body) = call!(app, authed(test::TestRequest::get().uri("/api/orders"), &manager));
  assert_eq!(body.as_array().unwrap().len(), 3);
  let (_, body) = call!(app, authed(test::TestRequest::get().uri("/api/orders"), &crew));
  assert!(body.as_array().unwrap().is_empty());

  let first_id = first["id"].as_i64().unwrap();
  let order_uri = format!("/api/orders/{}", first_id);
  call!(
    app,
    authed(test::TestRequest::patch().uri(&order_uri), &manager).set_json(json!({ "delivery_crew": crew_id }))
  );
  let (_, body) = call!(app, authed(test::TestRequest::get().uri("/api/orders"), &crew));
  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(body[0]["id"], first_id);
}

#[actix_web::test]
async fn foreign_orders_are_hidden() {
  let state = test_state();
  let app = spawn_app!(state);
  let (_, ana) = add_user(&state, "ana", &[], false).await;
  let (_, ben) = add_user(&state, "ben", &[], false).await;
  let (_, crew) = add_user(&state, "dino", &[Role::DeliveryCrew], false).await;
  let pasta = add_menu_item(&state, "Pasta", dec!(9.99)).await;

  call!(app, add_to_cart(&ana, pasta, 1));
  let (_, order) = call!(app, authed(test::TestRequest::post().uri("/api/orders"), &ana));
  let order_uri = format!("/api/orders/{}", order["id"]);

  let (status, _) = call!(app, authed(test::TestRequest::get().uri(&order_uri), &ana));
  assert_eq!(status, StatusCode::OK);
  let (status, _) = call!(app, authed(test::TestRequest::get().uri(&order_uri), &ben));
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = call!(app, authed(test::TestRequest::get().uri(&order_uri), &crew));
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = call!(app, authed(test::TestRequest::get().uri("/api/orders/424242"), &ana));
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = call!(app, authed(test::TestRequest::get().uri("/api/orders/not-a-number"), &ana));
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn crew_sets_status_while_managers_assign() {
  let state = test_state();
  let app = spawn_app!(state);
  let (_, ana) = add_user(&state, "ana", &[], false).await;
  let (_, manager) = add_user(&state, "mario", &[Role::Manager], false).await;
  let (crew_id, crew) = add_user(&state, "dino", &[Role::DeliveryCrew], false).await;
  let (other_crew_id, other_crew) = add_user(&state, "rita", &[Role::DeliveryCrew], false).await;
  let (customer_id, _) = add_user(&state, "ben", &[], false).await;
  let pasta = add_menu_item(&state, "Pasta", dec!(9.99)).await;

  call!(app, add_to_cart(&ana, pasta, 1));
  let (_, order) = call!(app, authed(test::TestRequest::post().uri("/api/orders"), &ana));
  let order_uri = format!("/api/orders/{}", order["id"]);
  let patch = |token: &str, body: Value| authed(test::TestRequest::patch().uri(&order_uri), token).set_json(body);

  // Crew cannot act on an order before it is assigned to them.
  let (status, _) = call!(app, patch(&crew, json!({ "status": true })));
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = call!(app, patch(&manager, json!({ "delivery_crew": crew_id })));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["delivery_crew"], crew_id);
  assert_eq!(body["stage"], "assigned");

  let (status, _) = call!(app, patch(&manager, json!({ "delivery_crew": customer_id })));
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = call!(app, patch(&crew, json!({ "status": 1 })));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], true);
  assert_eq!(body["stage"], "delivered");

  let (status, _) = call!(app, patch(&crew, json!({ "delivery_crew": other_crew_id })));
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = call!(app, patch(&other_crew, json!({ "status": false })));
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = call!(app, patch(&ana, json!({ "status": false })));
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = call!(app, patch(&manager, json!({ "status": false, "delivery_crew": null })));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], false);
  assert_eq!(body["delivery_crew"], Value::Null);
  assert_eq!(body["stage"], "placed");

  let (status, _) = call!(app, patch(&manager, json!({})));
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = call!(app, patch(&manager, json!({ "status": "maybe" })));
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn only_managers_delete_orders() {
  let state = test_state();
  let app = spawn_app!(state);
  let (_, ana) = add_user(&state, "ana", &[], false).await;
  let (_, manager) = add_user(&state, "mario", &[Role::Manager], false).await;
  let (crew_id, crew) = add_user(&state, "dino", &[Role::DeliveryCrew], false).await;
  let pasta = add_menu_item(&state, "Pasta", dec!(9.99)).await;

  call!(app, add_to_cart(&ana, pasta, 1));
  let (_, order) = call!(app, authed(test::TestRequest::post().uri("/api/orders"), &ana));
  let order_id = order["id"].as_i64().unwrap();
  let order_uri = format!("/api/orders/{}", order_id);
  call!(
    app,
    authed(test::TestRequest::patch().uri(&order_uri), &manager).set_json(json!({ "delivery_crew": crew_id }))
  );

  for token in [&ana, &crew] {
    let (status, _) = call!(app, authed(test::TestRequest::delete().uri(&order_uri), token));
    assert_eq!(status, StatusCode::FORBIDDEN);
  }
  let unchanged = state.store.find_order(order_id).await.unwrap().unwrap();
  assert_eq!(unchanged.order.delivery_crew_id, Some(crew_id));
  assert_eq!(unchanged.order_items.len(), 1);

  let (status, _) = call!(app, authed(test::TestRequest::delete().uri(&order_uri), &manager));
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call!(app, authed(test::TestRequest::delete().uri(&order_uri), &manager));
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn menu_price_changes_leave_orders_untouched() {
  let state = test_state();
  let app = spawn_app!(state);
  let (_, ana) = add_user(&state, "ana", &[], false).await;
  let (_, manager) = add_user(&state, "mario", &[Role::Manager], false).await;
  let pasta = add_menu_item(&state, "Pasta", dec!(9.99)).await;

  call!(app, add_to_cart(&ana, pasta, 2));
  let (_, order) = call!(app, authed(test::TestRequest::post().uri("/api/orders"), &ana));

  let (status, body) = call!(
    app,
    authed(test::TestRequest::patch().uri(&format!("/api/menu-items/{}", pasta)), &manager)
      .set_json(json!({ "price": "12.50" }))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["price"], "12.50");

  let (_, body) = call!(
    app,
    authed(test::TestRequest::get().uri(&format!("/api/orders/{}", order["id"])), &ana)
  );
  assert_eq!(body["total"], "19.98");
  assert_eq!(body["order_items"][0]["unit_price"], "9.99");
}

#[actix_web::test]
async fn ordered_menu_items_cannot_be_deleted() {
  let state = test_state();
  let app = spawn_app!(state);
  let (_, ana) = add_user(&state, "ana", &[], false).await;
  let (_, manager) = add_user(&state, "mario", &[Role::Manager], false).await;
  let pasta = add_menu_item(&state, "Pasta", dec!(9.99)).await;
  let soup = add_menu_item(&state, "Soup", dec!(5.00)).await;

  call!(app, add_to_cart(&ana, pasta, 1));
  call!(app, authed(test::TestRequest::post().uri("/api/orders"), &ana));
  call!(app, add_to_cart(&ana, soup, 1));

  let (status, _) = call!(
    app,
    authed(test::TestRequest::delete().uri(&format!("/api/menu-items/{}", pasta)), &manager)
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(state.store.find_menu_item(pasta).await.unwrap().is_some());

  let (status, _) = call!(
    app,
    authed(test::TestRequest::delete().uri(&format!("/api/menu-items/{}", soup)), &ana)
  );
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call!(
    app,
    authed(test::TestRequest::delete().uri(&format!("/api/menu-items/{}", soup)), &manager)
  );
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (_, cart) = call!(app, authed(test::TestRequest::get().uri("/api/cart/menu-items"), &ana));
  assert!(cart.as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn catalog_writes_require_a_manager() {
  let state = test_state();
  let app = spawn_app!(state);
  let (_, ana) = add_user(&state, "ana", &[], false).await;
  let (_, manager) = add_user(&state, "mario", &[Role::Manager], false).await;

  let (status, _) = call!(
    app,
    authed(test::TestRequest::post().uri("/api/categories"), &ana).set_json(json!({ "slug": "drinks", "title": "Drinks" }))
  );
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, category) = call!(
    app,
    authed(test::TestRequest::post().uri("/api/categories"), &manager)
      .set_json(json!({ "slug": "drinks", "title": "Drinks" }))
  );
  assert_eq!(status, StatusCode::CREATED);
  let (status, _) = call!(
    app,
    authed(test::TestRequest::post().uri("/api/categories"), &manager)
      .set_json(json!({ "slug": "drinks", "title": "More drinks" }))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let lemonade = json!({ "title": "Lemonade", "price": "3.25", "featured": true, "category_id": category["id"] });
  let (status, _) = call!(
    app,
    authed(test::TestRequest::post().uri("/api/menu-items"), &ana).set_json(lemonade.clone())
  );
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = call!(
    app,
    authed(test::TestRequest::post().uri("/api/menu-items"), &manager).set_json(lemonade)
  );
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["price"], "3.25");
  assert_eq!(body["category"]["slug"], "drinks");
  let item_uri = format!("/api/menu-items/{}", body["id"]);

  for bad in [
    json!({ "title": "Free water", "price": "0", "category_id": category["id"] }),
    json!({ "title": "Odd price", "price": "1.005", "category_id": category["id"] }),
    json!({ "title": "Lost", "price": "2.00", "category_id": 999 }),
    json!({ "title": "", "price": "2.00", "category_id": category["id"] }),
    json!({ "price": "2.00" }),
  ] {
    let (status, _) = call!(
      app,
      authed(test::TestRequest::post().uri("/api/menu-items"), &manager).set_json(bad)
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  let (status, body) = call!(
    app,
    authed(test::TestRequest::put().uri(&item_uri), &manager)
      .set_json(json!({ "title": "Pink Lemonade", "price": "3.75", "featured": false, "category_id": category["id"] }))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["title"], "Pink Lemonade");
  assert_eq!(body["featured"], false);

  let (status, body) = call!(app, authed(test::TestRequest::get().uri(&format!("{}/", item_uri)), &ana));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["price"], "3.75");
}

#[actix_web::test]
async fn menu_listing_filters_orders_and_pages() {
  let state = test_state();
  let app = spawn_app!(state);
  let (_, ana) = add_user(&state, "ana", &[], false).await;
  add_menu_item(&state, "Lemon Tart", dec!(6.00)).await;
  add_menu_item(&state, "Greek Salad", dec!(8.50)).await;
  add_menu_item(&state, "Lemon Soda", dec!(2.00)).await;

  let titles = |body: &Value| -> Vec<String> {
    body
      .as_array()
      .unwrap()
      .iter()
      .map(|item| item["title"].as_str().unwrap().to_string())
      .collect()
  };

  let (status, body) = call!(
    app,
    authed(test::TestRequest::get().uri("/api/menu-items?search=lemon&ordering=-price"), &ana)
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(titles(&body), vec!["Lemon Tart", "Lemon Soda"]);

  let (_, body) = call!(
    app,
    authed(test::TestRequest::get().uri("/api/menu-items?ordering=title&perpage=2&page=2"), &ana)
  );
  assert_eq!(titles(&body), vec!["Lemon Tart"]);

  let (_, body) = call!(app, authed(test::TestRequest::get().uri("/api/menu-items?category=mains"), &ana));
  assert_eq!(body.as_array().unwrap().len(), 3);

  let (status, _) = call!(app, authed(test::TestRequest::get().uri("/api/menu-items?ordering=calories"), &ana));
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = call!(app, authed(test::TestRequest::get().uri("/api/menu-items?page=abc"), &ana));
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let all = state.store.list_menu_items(&MenuItemFilter::default()).await.unwrap();
  assert_eq!(all.len(), 3);
}

#[actix_web::test]
async fn group_membership_is_managed_by_managers() {
  let state = test_state();
  let app = spawn_app!(state);
  let (_, admin) = add_user(&state, "admin", &[], true).await;
  let (_, ana) = add_user(&state, "ana", &[], false).await;
  let (mario_id, _) = add_user(&state, "mario", &[], false).await;

  let promote = |token: &str, group: &str, username: &str| {
    authed(
      test::TestRequest::post().uri(&format!("/api/groups/{}/users", group)),
      token,
    )
    .set_json(json!({ "username": username }))
  };

  let (status, _) = call!(app, promote(&ana, "manager", "mario"));
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = call!(app, promote(&admin, "manager", "mario"));
  assert_eq!(status, StatusCode::CREATED);
  assert!(body["message"].as_str().unwrap().contains("promoted"));

  let (status, body) = call!(app, promote(&admin, "manager", "mario"));
  assert_eq!(status, StatusCode::OK);
  assert!(body["message"].as_str().unwrap().contains("already"));

  let (status, _) = call!(app, promote(&admin, "manager", "nobody"));
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = call!(app, promote(&admin, "chefs", "mario"));
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (_, body) = call!(app, authed(test::TestRequest::get().uri("/api/groups/manager/users"), &admin));
  let members = body.as_array().unwrap();
  assert_eq!(members.len(), 1);
  assert_eq!(members[0]["username"], "mario");

  // The freshly promoted manager can now manage the delivery crew.
  let (status, _) = call!(app, promote("token-mario", "delivery-crew", "ana"));
  assert_eq!(status, StatusCode::CREATED);
  assert!(state.store.user_roles(mario_id).await.unwrap().contains(Role::Manager));

  let remove_uri = format!("/api/groups/manager/users/{}", mario_id);
  let (status, body) = call!(app, authed(test::TestRequest::delete().uri(&remove_uri), &admin));
  assert_eq!(status, StatusCode::OK);
  assert!(body["message"].as_str().unwrap().contains("demoted"));
  let (status, body) = call!(app, authed(test::TestRequest::delete().uri(&remove_uri), &admin));
  assert_eq!(status, StatusCode::OK);
  assert!(body["message"].as_str().unwrap().contains("not"));
  let (status, _) = call!(
    app,
    authed(test::TestRequest::delete().uri("/api/groups/manager/users/999"), &admin)
  );
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn malformed_bodies_are_bad_requests() {
  let state = test_state();
  let app = spawn_app!(state);
  let (_, ana) = add_user(&state, "ana", &[], false).await;

  let (status, body) = call!(
    app,
    authed(test::TestRequest::post().uri("/api/cart/menu-items"), &ana)
      .insert_header(("Content-Type", "application/json"))
      .set_payload("{not json")
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["message"].is_string());

  let (status, _) = call!(
    app,
    authed(test::TestRequest::post().uri("/api/cart/menu-items"), &ana).set_json(json!({ "quantity": 1 }))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn replacing_a_menu_item_requires_every_field() {
  let state = test_state();
  let app = spawn_app!(state);
  let (_, manager) = add_user(&state, "mario", &[Role::Manager], false).await;
  let pasta = add_menu_item(&state, "Pasta", dec!(9.99)).await;
  let category_id = state.store.find_menu_item(pasta).await.unwrap().unwrap().category.id;
  let item_uri = format!("/api/menu-items/{}", pasta);

  let (status, body) = call!(
    app,
    authed(test::TestRequest::put().uri(&item_uri), &manager)
      .set_json(json!({ "title": "Pasta", "price": "9.99", "featured": true, "category_id": category_id }))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["featured"], true);

  let (status, _) = call!(
    app,
    authed(test::TestRequest::put().uri(&item_uri), &manager)
      .set_json(json!({ "title": "Pasta", "price": "11.00", "category_id": category_id }))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let unchanged = state.store.find_menu_item(pasta).await.unwrap().unwrap();
  assert!(unchanged.featured);
  assert_eq!(unchanged.price, dec!(9.99));
}

#[actix_web::test]
async fn largest_cart_line_is_accepted_and_one_more_unit_is_not() {
  let state = test_state();
  let app = spawn_app!(state);
  let (_, token) = add_user(&state, "ana", &[], false).await;
  let caviar = add_menu_item(&state, "Caviar", dec!(9999.99)).await;

  let (status, _) = call!(app, add_to_cart(&token, caviar, 32768));
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = call!(app, add_to_cart(&token, caviar, 32767));
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["price"], "327669672.33");

  let (status, body) = call!(app, authed(test::TestRequest::post().uri("/api/orders"), &token));
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["total"], "327669672.33");
}

#[actix_web::test]
async fn authentication_is_checked_before_the_request_body() {
  let state = test_state();
  let app = spawn_app!(state);

  let (status, _) = call!(
    app,
    test::TestRequest::post()
      .uri("/api/cart/menu-items")
      .insert_header(("Content-Type", "application/json"))
      .set_payload("{bad")
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = call!(
    app,
    test::TestRequest::patch()
      .uri("/api/orders/not-a-number")
      .set_json(json!({ "status": "maybe" }))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = call!(
    app,
    authed(test::TestRequest::post().uri("/api/groups/manager/users"), "bogus").set_json(json!({}))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}
