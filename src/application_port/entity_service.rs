use crate::domain_model::Entity;
use crate::domain_port::{RequestCtx, StoreError};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("entity not found")]
    NotFound,
    #[error("entity already exists: {0}")]
    Conflict(String),
    #[error("store error in {op}: {message}")]
    Store { op: &'static str, message: String },
    #[error("request cancelled")]
    Cancelled,
}

impl EntityError {
    pub fn store(op: &'static str, error: StoreError) -> Self {
        match error {
            StoreError::NotFound => EntityError::NotFound,
            StoreError::Conflict(what) => EntityError::Conflict(what),
            StoreError::Interrupted(_) => EntityError::Cancelled,
            other => EntityError::Store {
                op,
                message: other.to_string(),
            },
        }
    }
}

#[async_trait::async_trait]
pub trait EntityService<T: Entity>: Send + Sync {
    async fn get(&self, ctx: &RequestCtx, id: Uuid) -> Result<T, EntityError>;
    async fn list(&self, ctx: &RequestCtx) -> Result<Vec<T>, EntityError>;
    async fn create(&self, ctx: &RequestCtx, entity: T) -> Result<T, EntityError>;
    async fn update(&self, ctx: &RequestCtx, id: Uuid, entity: T) -> Result<T, EntityError>;
    async fn delete(&self, ctx: &RequestCtx, id: Uuid) -> Result<(), EntityError>;
}
