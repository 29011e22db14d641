//! Application-level errors

use crate::core::error_handling::ContextualError;
use crate::system::SystemError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read topology file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse topology file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid topology: {0}")]
    Invalid(String),

    #[error("No topology file given and none found at {0}")]
    NoTopology(String),

    #[error("Run cancelled before completion")]
    Cancelled,

    #[error("Failed to serialise statistics: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    System(#[from] SystemError),
}

impl ContextualError for AppError {
    fn is_user_actionable(&self) -> bool {
        match self {
            AppError::Io { .. }
            | AppError::Parse { .. }
            | AppError::Invalid(_)
            | AppError::NoTopology(_)
            | AppError::Cancelled => true,
            AppError::Serialize(_) => false,
            AppError::System(e) => e.is_user_actionable(),
        }
    }

    fn user_message(&self) -> Option<String> {
        match self {
            AppError::System(e) => e.user_message(),
            AppError::Serialize(_) => None,
            other => Some(other.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
