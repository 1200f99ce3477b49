use super::{CacheError, RequestCtx, StoreError};
use crate::domain_model::Entity;
use uuid::Uuid;

/// Primary store for one entity kind.
#[async_trait::async_trait]
pub trait EntityStore<T: Entity>: Send + Sync {
    async fn get(&self, ctx: &RequestCtx, id: Uuid) -> Result<Option<T>, StoreError>;

    async fn list(&self, ctx: &RequestCtx) -> Result<Vec<T>, StoreError>;

    /// `entity.id()` is already assigned by the caller.
    async fn create(&self, ctx: &RequestCtx, entity: &T) -> Result<(), StoreError>;

    /// `StoreError::NotFound` if no row has `id`.
    async fn update(&self, ctx: &RequestCtx, id: Uuid, entity: &T) -> Result<(), StoreError>;

    /// `StoreError::NotFound` if no row has `id`.
    async fn delete(&self, ctx: &RequestCtx, id: Uuid) -> Result<(), StoreError>;
}

/// TTL cache for one entity kind.
#[async_trait::async_trait]
pub trait EntityCache<T: Entity>: Send + Sync {
    /// A hit refreshes the entry's TTL.
    async fn get(&self, ctx: &RequestCtx, id: Uuid) -> Result<Option<T>, CacheError>;

    /// Write-through; replaces any existing entry.
    async fn set(&self, ctx: &RequestCtx, entity: &T) -> Result<(), CacheError>;

    /// Read-path fill. Leaves an existing entry untouched so a row loaded
    /// before a concurrent write cannot replace the newer copy.
    async fn set_if_absent(&self, ctx: &RequestCtx, entity: &T) -> Result<(), CacheError>;

    /// Removing an absent entry is not an error.
    async fn invalidate(&self, ctx: &RequestCtx, id: Uuid) -> Result<(), CacheError>;
}
