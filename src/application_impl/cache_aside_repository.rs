use crate::application_port::*;
use crate::domain_model::Entity;
use crate::domain_port::*;
use crate::logger::*;
use std::sync::Arc;
use uuid::Uuid;

/// Read-through / write-through wrapper around a primary store. The cache
/// only ever holds values the primary has already accepted.
pub struct CacheAsideRepository<T: Entity> {
    store: Arc<dyn EntityStore<T>>,
    cache: Arc<dyn EntityCache<T>>,
}

impl<T: Entity> CacheAsideRepository<T> {
    pub fn new(store: Arc<dyn EntityStore<T>>, cache: Arc<dyn EntityCache<T>>) -> Self {
        Self { store, cache }
    }

    /// Write-through after the primary accepted `entity`.
    async fn populate(&self, ctx: &RequestCtx, entity: &T) {
        if let Err(e) = self.cache.set(ctx, entity).await {
            warn!(kind = T::KIND, id = %entity.id(), error = %e, "cache populate failed");
            self.invalidate(ctx, entity.id()).await;
        }
    }

    /// Read-miss fill. Never replaces an entry a concurrent write put there.
    async fn fill(&self, ctx: &RequestCtx, entity: &T) {
        if let Err(e) = self.cache.set_if_absent(ctx, entity).await {
            warn!(kind = T::KIND, id = %entity.id(), error = %e, "cache fill failed");
            self.invalidate(ctx, entity.id()).await;
        }
    }

    async fn invalidate(&self, ctx: &RequestCtx, id: Uuid) {
        if let Err(e) = self.cache.invalidate(ctx, id).await {
            warn!(kind = T::KIND, %id, error = %e, "cache invalidate failed");
        }
    }
}

#[async_trait::async_trait]
impl<T: Entity> EntityService<T> for CacheAsideRepository<T> {
    async fn get(&self, ctx: &RequestCtx, id: Uuid) -> Result<T, EntityError> {
        match self.cache.get(ctx, id).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(CacheError::Interrupted(_)) => return Err(EntityError::Cancelled),
            Err(e) => warn!(kind = T::KIND, %id, error = %e, "cache read failed, treating as miss"),
        }

        let entity = self
            .store
            .get(ctx, id)
            .await
            .map_err(|e| EntityError::store("get", e))?
            .ok_or(EntityError::NotFound)?;

        self.fill(ctx, &entity).await;
        Ok(entity)
    }

    async fn list(&self, ctx: &RequestCtx) -> Result<Vec<T>, EntityError> {
        self.store
            .list(ctx)
            .await
            .map_err(|e| EntityError::store("list", e))
    }

    async fn create(&self, ctx: &RequestCtx, mut entity: T) -> Result<T, EntityError> {
        if entity.id().is_nil() {
            entity.set_id(Uuid::new_v4());
        }

        self.store
            .create(ctx, &entity)
            .await
            .map_err(|e| EntityError::store("create", e))?;

        self.populate(ctx, &entity).await;
        debug!(kind = T::KIND, id = %entity.id(), "created");
        Ok(entity)
    }

    async fn update(&self, ctx: &RequestCtx, id: Uuid, mut entity: T) -> Result<T, EntityError> {
        entity.set_id(id);

        self.invalidate(ctx, id).await;
        self.store
            .update(ctx, id, &entity)
            .await
            .map_err(|e| EntityError::store("update", e))?;

        self.populate(ctx, &entity).await;
        debug!(kind = T::KIND, %id, "updated");
        Ok(entity)
    }

    async fn delete(&self, ctx: &RequestCtx, id: Uuid) -> Result<(), EntityError> {
        self.invalidate(ctx, id).await;
        self.store
            .delete(ctx, id)
            .await
            .map_err(|e| EntityError::store("delete", e))?;
        debug!(kind = T::KIND, %id, "deleted");
        Ok(())
    }
}
