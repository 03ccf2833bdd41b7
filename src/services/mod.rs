// Services module - Business logic

pub mod authorization_store;
pub mod authorization_window;
pub mod directory;
pub mod identity;
pub mod lookup_cache;
pub mod memory_store;
pub mod pickup_authorizations;
pub mod self_checkout;
