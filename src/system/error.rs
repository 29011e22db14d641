//! System Error Types

use crate::core::error_handling::ContextualError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// Invalid topology or lifecycle misuse; the offending call changed nothing
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A producer could not enqueue within its bounded wait
    #[error("Producer '{producer}' could not enqueue into '{queue}' within {waited:?}")]
    BackpressureTimeout {
        producer: String,
        queue: String,
        waited: Duration,
    },

    /// Unexpected failure inside a worker loop; fatal to that worker only
    #[error("Worker '{worker}' failed: {message}")]
    WorkerFault { worker: String, message: String },

    #[error("Failed to spawn worker thread '{worker}': {source}")]
    Spawn {
        worker: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{resource} lock poisoned: {message}")]
    Poisoned { resource: String, message: String },
}

impl SystemError {
    pub fn configuration(message: impl Into<String>) -> Self {
        SystemError::Configuration {
            message: message.into(),
        }
    }

    pub fn worker_fault(worker: &str, error: impl std::fmt::Display) -> Self {
        SystemError::WorkerFault {
            worker: worker.to_string(),
            message: error.to_string(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, SystemError::Configuration { .. })
    }
}

impl ContextualError for SystemError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, SystemError::Configuration { .. })
    }

    fn user_message(&self) -> Option<String> {
        match self {
            SystemError::Configuration { message } => Some(message.clone()),
            _ => None,
        }
    }
}

/// Result type for orchestrator and worker operations
pub type SystemResult<T> = Result<T, SystemError>;
