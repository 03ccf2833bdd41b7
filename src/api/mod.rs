// API module - HTTP endpoints

pub mod auth;
pub mod authorizations;
pub mod health;
pub mod middleware;
pub mod self_checkout;
