use std::io;

use http::status::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use tokio::sync::{mpsc::error::SendError as TokioSendError, oneshot::error::RecvError};

#[cfg(feature = "service")]
use sqlx::Error as SqlxError;

#[cfg(feature = "redis")]
use redis::RedisError;

use crate::processor::GraphChange;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum HierarchyError {
    #[error("Reachability cache error: {0}")]
    Cache(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid vertex: {0}")]
    InvalidVertex(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Change processor error: {0}")]
    Processor(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Edge source error: {0}")]
    Source(String),
    #[error("Hierarchy startup load failed: {0}")]
    Startup(String),
}

impl HierarchyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HierarchyError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HierarchyError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HierarchyError::InvalidVertex(_) => StatusCode::BAD_REQUEST,
            HierarchyError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HierarchyError::Processor(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HierarchyError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HierarchyError::Source(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HierarchyError::Startup(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// True for failures of an external backend (cache store or edge source), as opposed to
    /// malformed data or misconfiguration.
    pub fn is_backend(&self) -> bool {
        matches!(self, HierarchyError::Cache(_) | HierarchyError::Source(_))
    }
}

impl From<toml::de::Error> for HierarchyError {
    fn from(src: toml::de::Error) -> HierarchyError {
        HierarchyError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for HierarchyError {
    fn from(src: toml::ser::Error) -> HierarchyError {
        HierarchyError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for HierarchyError {
    fn from(src: JsonError) -> HierarchyError {
        HierarchyError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<uuid::Error> for HierarchyError {
    fn from(src: uuid::Error) -> HierarchyError {
        HierarchyError::InvalidVertex(format!("UUID conversion failed: {src}"))
    }
}

impl From<io::Error> for HierarchyError {
    fn from(x: io::Error) -> Self {
        HierarchyError::Io(format!("IOError: {}: {x}", x.kind()))
    }
}

impl From<TokioSendError<GraphChange>> for HierarchyError {
    fn from(x: TokioSendError<GraphChange>) -> Self {
        HierarchyError::Processor(format!(
            "Change queue closed, could not submit {} of {}",
            x.0.kind, x.0.edge
        ))
    }
}

impl From<RecvError> for HierarchyError {
    fn from(_: RecvError) -> Self {
        HierarchyError::Processor(
            "Change processor dropped the reply channel before answering".to_string(),
        )
    }
}

#[cfg(feature = "service")]
impl From<SqlxError> for HierarchyError {
    fn from(db_error: SqlxError) -> Self {
        HierarchyError::Source(format!("database error: {db_error:?}"))
    }
}

#[cfg(feature = "service")]
impl From<sqlx::migrate::MigrateError> for HierarchyError {
    fn from(migrate_error: sqlx::migrate::MigrateError) -> Self {
        HierarchyError::Source(format!("database migration error: {migrate_error}"))
    }
}

#[cfg(feature = "redis")]
impl From<RedisError> for HierarchyError {
    fn from(redis_error: RedisError) -> Self {
        HierarchyError::Cache(format!("redis error: {redis_error}"))
    }
}
