use super::{CacheError, RequestCtx};
use crate::domain_model::*;
use std::time::Duration;

/// Low-latency mirror of refresh fingerprints. Never authoritative.
#[async_trait::async_trait]
pub trait SessionCache: Send + Sync {
    async fn get_fingerprint(
        &self,
        ctx: &RequestCtx,
        user_id: UserId,
    ) -> Result<Option<Fingerprint>, CacheError>;

    async fn set_fingerprint(
        &self,
        ctx: &RequestCtx,
        user_id: UserId,
        fingerprint: &Fingerprint,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Removing an absent entry is not an error.
    async fn invalidate(&self, ctx: &RequestCtx, user_id: UserId) -> Result<(), CacheError>;
}
