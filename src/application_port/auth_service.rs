use crate::domain_model::*;
use crate::domain_port::{RequestCtx, StoreError};
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("token malformed")]
    TokenMalformed,
    #[error("token expired")]
    TokenExpired,
    #[error("token signature invalid")]
    SignatureInvalid,
    #[error("refresh token invalid")]
    RefreshTokenInvalid,
    #[error("forbidden")]
    Forbidden,
    #[error("login already taken")]
    LoginTaken,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("store error in {op}: {message}")]
    Store { op: &'static str, message: String },
    #[error("request cancelled")]
    Cancelled,
    #[error("internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Wraps a primary-store failure with the name of the failing operation.
    pub fn store(op: &'static str, error: StoreError) -> Self {
        match error {
            StoreError::Interrupted(_) => AuthError::Cancelled,
            other => AuthError::Store {
                op,
                message: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub login: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub login: String,
    pub password: String,
}

/// A successful login: the caller's id plus its first token pair.
#[derive(Debug, Clone)]
pub struct LoginOutput {
    pub user_id: UserId,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone)]
pub struct RotateInput {
    pub subject_id: UserId,
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    /// `Ok(false)` on mismatch; `Err` only for an unparseable hash.
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

pub trait TokenCodec: Send + Sync {
    /// Signs `{sub, role?, iat: now, exp: now + ttl, jti}`.
    fn issue(
        &self,
        subject: UserId,
        role: Option<Role>,
        jti: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), AuthError>;

    /// Full validation: algorithm, signature, structure and `exp > now`.
    fn parse(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedClaims, AuthError>;

    /// Same as `parse` without the expiry rule.
    fn parse_ignoring_expiry(&self, token: &str) -> Result<VerifiedClaims, AuthError>;
}

#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    async fn signup(&self, ctx: &RequestCtx, request: SignupInput) -> Result<UserId, AuthError>;
    async fn login(&self, ctx: &RequestCtx, request: LoginInput)
    -> Result<LoginOutput, AuthError>;
    async fn rotate(&self, ctx: &RequestCtx, request: RotateInput)
    -> Result<TokenPair, AuthError>;
    async fn list_users(&self, ctx: &RequestCtx) -> Result<Vec<UserSummary>, AuthError>;
    async fn delete_user(&self, ctx: &RequestCtx, user_id: UserId) -> Result<(), AuthError>;
}
