use super::Interrupted;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store call interrupted: {0}")]
    Interrupted(#[from] Interrupted),
}

impl StoreError {
    pub fn unavailable<E: std::fmt::Display>(e: E) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache codec: {0}")]
    Codec(String),
    #[error("cache call interrupted: {0}")]
    Interrupted(#[from] Interrupted),
}

impl CacheError {
    pub fn unavailable<E: std::fmt::Display>(e: E) -> Self {
        CacheError::Unavailable(e.to_string())
    }

    pub fn codec<E: std::fmt::Display>(e: E) -> Self {
        CacheError::Codec(e.to_string())
    }
}
