// context

mod request_ctx;
mod store_error;

pub use request_ctx::*;
pub use store_error::*;

// store

mod credential_store;
mod entity_store;
mod session_cache;

pub use credential_store::*;
pub use entity_store::*;
pub use session_cache::*;
