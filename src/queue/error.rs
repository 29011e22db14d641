//! Queue Error Types

use crate::queue::item::ItemError;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue '{queue}' is full (capacity: {capacity})")]
    Full { queue: String, capacity: usize },

    #[error("Queue '{queue}' lock poisoned: {message}")]
    Poisoned { queue: String, message: String },

    #[error(transparent)]
    InvalidStatus(#[from] ItemError),
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
