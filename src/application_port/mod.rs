mod auth_service;
mod entity_service;

pub use auth_service::*;
pub use entity_service::*;
