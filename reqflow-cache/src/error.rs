use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store error: {0}")]
    Backend(String),

    #[error("Store lock poisoned: {0}")]
    Poisoned(String),

    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] rustis::Error),
}
