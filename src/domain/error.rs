// src/domain/error.rs
use crate::domain::document::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to serialize: {0}")]
    SerializationError(String),

    #[error("Failed to deserialize: {0}")]
    DeserializationError(String),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Invalid origin pattern: {0}")]
    InvalidOrigin(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl DomainError {
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        match self {
            DomainError::Storage(msg) => DomainError::Storage(format!("{}: {}", context.into(), msg)),
            DomainError::Document(msg) => {
                DomainError::Document(format!("{}: {}", context.into(), msg))
            }
            DomainError::Other(msg) => DomainError::Other(format!("{}: {}", context.into(), msg)),
            err => DomainError::Other(format!("{}: {}", context.into(), err)),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::SerializationError(e.to_string())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
