// lemon_api/src/lib.rs

//! Little Lemon restaurant ordering API.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod policy;
pub mod services;
pub mod state;
pub mod store;
pub mod web;

pub use crate::errors::{AppError, Result};
pub use crate::state::AppState;
