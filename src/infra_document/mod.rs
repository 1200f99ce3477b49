//! Document-style primary stores and in-process TTL caches. Selected with
//! `store.backend = "document"` / `cache.backend = "memory"`, and used as
//! the doubles in tests.

mod cache_memory;
mod credential_store_document;
mod entity_store_document;

pub use cache_memory::*;
pub use credential_store_document::*;
pub use entity_store_document::*;
