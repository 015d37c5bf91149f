// lemon_api/src/web/handlers/mod.rs

pub mod cart_handlers;
pub mod category_handlers;
pub mod group_handlers;
pub mod menu_handlers;
pub mod order_handlers;
pub mod user_handlers;
