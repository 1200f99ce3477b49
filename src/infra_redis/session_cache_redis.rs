use crate::domain_model::*;
use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Fingerprints as hex strings under `{prefix}:session:{user_id}`.
pub struct RedisSessionCache {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisSessionCache {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionCache {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, user_id: UserId) -> String {
        format!("{}:session:{}", self.prefix, user_id)
    }
}

#[async_trait::async_trait]
impl SessionCache for RedisSessionCache {
    async fn get_fingerprint(
        &self,
        ctx: &RequestCtx,
        user_id: UserId,
    ) -> Result<Option<Fingerprint>, CacheError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let val: Option<String> = ctx
            .run(conn.get(&key))
            .await?
            .map_err(CacheError::unavailable)?;

        val.map(|hex| Fingerprint::from_hex(&hex))
            .transpose()
            .map_err(CacheError::codec)
    }

    async fn set_fingerprint(
        &self,
        ctx: &RequestCtx,
        user_id: UserId,
        fingerprint: &Fingerprint,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let _: () = ctx
            .run(conn.set_ex(&key, fingerprint.to_hex(), ttl.as_secs().max(1)))
            .await?
            .map_err(CacheError::unavailable)?;
        Ok(())
    }

    async fn invalidate(&self, ctx: &RequestCtx, user_id: UserId) -> Result<(), CacheError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let _: () = ctx
            .run(conn.del(&key))
            .await?
            .map_err(CacheError::unavailable)?;
        Ok(())
    }
}
