use crate::domain_model::*;
use crate::domain_port::*;
use moka::Expiry;
use moka::future::Cache;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Upper bound on entries held by one in-process cache.
const DEFAULT_CACHE_CAPACITY: u64 = 100_000;

/// Fingerprints live for the TTL given at write time.
struct PerEntryTtl;

impl Expiry<UserId, (Fingerprint, Duration)> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &UserId,
        value: &(Fingerprint, Duration),
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.1)
    }

    fn expire_after_update(
        &self,
        _key: &UserId,
        value: &(Fingerprint, Duration),
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.1)
    }
}

/// In-process stand-in for the redis session cache.
pub struct MemorySessionCache {
    entries: Cache<UserId, (Fingerprint, Duration)>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        MemorySessionCache {
            entries: Cache::builder()
                .max_capacity(DEFAULT_CACHE_CAPACITY)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }
}

impl Default for MemorySessionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionCache for MemorySessionCache {
    async fn get_fingerprint(
        &self,
        ctx: &RequestCtx,
        user_id: UserId,
    ) -> Result<Option<Fingerprint>, CacheError> {
        ctx.check()?;
        Ok(self.entries.get(&user_id).await.map(|(fp, _)| fp))
    }

    async fn set_fingerprint(
        &self,
        ctx: &RequestCtx,
        user_id: UserId,
        fingerprint: &Fingerprint,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        ctx.check()?;
        self.entries
            .insert(user_id, (fingerprint.clone(), ttl))
            .await;
        Ok(())
    }

    async fn invalidate(&self, ctx: &RequestCtx, user_id: UserId) -> Result<(), CacheError> {
        ctx.check()?;
        self.entries.invalidate(&user_id).await;
        Ok(())
    }
}

/// In-process stand-in for the redis entity cache. A hit restarts the TTL.
pub struct MemoryEntityCache<T: Entity> {
    entries: Cache<Uuid, T>,
}

impl<T: Entity> MemoryEntityCache<T> {
    pub fn new(ttl: Duration) -> Self {
        MemoryEntityCache {
            entries: Cache::builder()
                .max_capacity(DEFAULT_CACHE_CAPACITY)
                .time_to_idle(ttl)
                .build(),
        }
    }
}

#[async_trait::async_trait]
impl<T: Entity> EntityCache<T> for MemoryEntityCache<T> {
    async fn get(&self, ctx: &RequestCtx, id: Uuid) -> Result<Option<T>, CacheError> {
        ctx.check()?;
        Ok(self.entries.get(&id).await)
    }

    async fn set(&self, ctx: &RequestCtx, entity: &T) -> Result<(), CacheError> {
        ctx.check()?;
        self.entries.insert(entity.id(), entity.clone()).await;
        Ok(())
    }

    async fn set_if_absent(&self, ctx: &RequestCtx, entity: &T) -> Result<(), CacheError> {
        ctx.check()?;
        self.entries
            .entry(entity.id())
            .or_insert(entity.clone())
            .await;
        Ok(())
    }

    async fn invalidate(&self, ctx: &RequestCtx, id: Uuid) -> Result<(), CacheError> {
        ctx.check()?;
        self.entries.invalidate(&id).await;
        Ok(())
    }
}
