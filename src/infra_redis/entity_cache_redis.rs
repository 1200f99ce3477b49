use crate::domain_model::Entity;
use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::marker::PhantomData;
use std::time::Duration;
use uuid::Uuid;

/// JSON copies of entities under `{prefix}:{kind}:{id}`.
pub struct RedisEntityCache<T> {
    conn: ConnectionManager,
    prefix: String,
    ttl_secs: u64,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Entity> RedisEntityCache<T> {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, ttl: Duration) -> Self {
        RedisEntityCache {
            conn,
            prefix: prefix.into(),
            ttl_secs: ttl.as_secs().max(1),
            _kind: PhantomData,
        }
    }

    fn key(&self, id: Uuid) -> String {
        format!("{}:{}:{}", self.prefix, T::KIND, id)
    }
}

#[async_trait::async_trait]
impl<T: Entity> EntityCache<T> for RedisEntityCache<T> {
    async fn get(&self, ctx: &RequestCtx, id: Uuid) -> Result<Option<T>, CacheError> {
        let key = self.key(id);
        let mut conn = self.conn.clone();
        // GETEX reads and restarts the TTL in one round trip.
        let val: Option<String> = ctx
            .run(
                redis::cmd("GETEX")
                    .arg(&key)
                    .arg("EX")
                    .arg(self.ttl_secs)
                    .query_async(&mut conn),
            )
            .await?
            .map_err(CacheError::unavailable)?;

        val.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(CacheError::codec)
    }

    async fn set(&self, ctx: &RequestCtx, entity: &T) -> Result<(), CacheError> {
        let key = self.key(entity.id());
        let json = serde_json::to_string(entity).map_err(CacheError::codec)?;
        let mut conn = self.conn.clone();
        let _: () = ctx
            .run(conn.set_ex(&key, json, self.ttl_secs))
            .await?
            .map_err(CacheError::unavailable)?;
        Ok(())
    }

    async fn set_if_absent(&self, ctx: &RequestCtx, entity: &T) -> Result<(), CacheError> {
        let key = self.key(entity.id());
        let json = serde_json::to_string(entity).map_err(CacheError::codec)?;
        let mut conn = self.conn.clone();
        // Nil reply when the key already exists.
        let _: Option<String> = ctx
            .run(
                redis::cmd("SET")
                    .arg(&key)
                    .arg(json)
                    .arg("NX")
                    .arg("EX")
                    .arg(self.ttl_secs)
                    .query_async(&mut conn),
            )
            .await?
            .map_err(CacheError::unavailable)?;
        Ok(())
    }

    async fn invalidate(&self, ctx: &RequestCtx, id: Uuid) -> Result<(), CacheError> {
        let key = self.key(id);
        let mut conn = self.conn.clone();
        let _: () = ctx
            .run(conn.del(&key))
            .await?
            .map_err(CacheError::unavailable)?;
        Ok(())
    }
}
