use super::{RequestCtx, StoreError};
use crate::domain_model::*;

#[derive(Debug, Clone)]
pub struct NewCredential {
    pub id: UserId,
    pub login: String,
    pub password_hash: String,
    pub role: Role,
}

/// Primary, authoritative store for user credentials.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a credential. A duplicate login yields `StoreError::Conflict`.
    async fn create(&self, ctx: &RequestCtx, credential: NewCredential) -> Result<(), StoreError>;

    /// Fetch credentials by login (for login).
    async fn get_by_login(
        &self,
        ctx: &RequestCtx,
        login: &str,
    ) -> Result<Option<Credential>, StoreError>;

    async fn list(&self, ctx: &RequestCtx) -> Result<Vec<Credential>, StoreError>;

    /// `Ok(None)` when the user exists but has never logged in;
    /// `StoreError::NotFound` when the user does not exist.
    async fn get_refresh_fingerprint(
        &self,
        ctx: &RequestCtx,
        user_id: UserId,
    ) -> Result<Option<Fingerprint>, StoreError>;

    /// Overwrites the fingerprint unconditionally (no compare-and-swap).
    async fn set_refresh_fingerprint(
        &self,
        ctx: &RequestCtx,
        user_id: UserId,
        fingerprint: &Fingerprint,
    ) -> Result<(), StoreError>;

    async fn delete(&self, ctx: &RequestCtx, user_id: UserId) -> Result<(), StoreError>;
}
