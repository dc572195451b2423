//! Error types for the ID manager
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to a frontend as plain messages.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Item not found: {0}")]
    ItemNotFound(i64),

    #[error("Tag not found: {0}")]
    TagNotFound(i64),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Tag already exists: {0}")]
    DuplicateTag(String),

    #[error("Invalid value {value:?} for setting {key}")]
    InvalidSetting { key: String, value: String },

    #[error("{0}")]
    Generic(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
