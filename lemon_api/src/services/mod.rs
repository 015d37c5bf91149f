// lemon_api/src/services/mod.rs

pub mod auth_service;
pub mod catalog_service;
pub mod group_service;
