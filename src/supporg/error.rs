use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupporgError {
    #[error("Supplement not found: {0}")]
    ItemNotFound(String),

    #[error("Slot not found: {0}")]
    SlotNotFound(String),

    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("Appointment not found: {0}")]
    AppointmentNotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Import rejected: {0}")]
    Import(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),

    #[error("Api Error: {0}")]
    Api(String),
}

impl SupporgError {
    pub fn validation(msg: impl Into<String>) -> Self {
        SupporgError::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SupporgError>;
