// lemon_api/src/models/mod.rs

//! Records persisted by the store and the shapes returned to API clients.

pub mod cart_item;
pub mod category;
pub mod menu_item;
pub mod money;
pub mod order;
pub mod order_item;
pub mod role;
pub mod user;

pub use cart_item::{CartItem, NewCartItem};
pub use category::{Category, NewCategory};
pub use menu_item::{MenuItem, MenuItemChanges, MenuItemFilter, MenuItemView, MenuOrdering, NewMenuItem};
pub use order::{Order, OrderChanges, OrderDraft, OrderScope, OrderStage, OrderView};
pub use order_item::{OrderItem, OrderItemDraft};
pub use role::{Role, RoleSet};
pub use user::{NewUser, User, UserSummary};
