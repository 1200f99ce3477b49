mod entity_cache_redis;
mod session_cache_redis;

pub use entity_cache_redis::*;
pub use session_cache_redis::*;
