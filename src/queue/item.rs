//! Items carried through the hand-off queues
//!
//! An [`Item`] wraps one element of a producer's source. Identity and payload
//! never change after construction; only the lifecycle status moves, and only
//! forward by exactly one step at a time.

use serde::Serialize;
use std::fmt;
use std::time::SystemTime;

/// Lifecycle of an item in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    InQueue,
    Consumed,
}

impl ItemStatus {
    /// The only status this one may advance to, if any
    pub fn successor(self) -> Option<ItemStatus> {
        match self {
            ItemStatus::Pending => Some(ItemStatus::InQueue),
            ItemStatus::InQueue => Some(ItemStatus::Consumed),
            ItemStatus::Consumed => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::InQueue => "in_queue",
            ItemStatus::Consumed => "consumed",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemError {
    #[error("Item {id}: illegal status transition {from} -> {to}")]
    InvalidTransition {
        id: u64,
        from: ItemStatus,
        to: ItemStatus,
    },
}

/// A unit of work moving from a producer to a consumer
///
/// # Example
///
/// ```rust
/// use handoff::queue::{Item, ItemStatus};
///
/// let mut item = Item::new(0, "Data-0");
/// assert_eq!(item.status(), ItemStatus::Pending);
///
/// item.advance(ItemStatus::InQueue).unwrap();
/// assert!(item.advance(ItemStatus::Pending).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Item<T> {
    id: u64,
    payload: T,
    created_at: SystemTime,
    status: ItemStatus,
}

impl<T> Item<T> {
    /// New pending item stamped with the current time
    pub fn new(id: u64, payload: T) -> Self {
        Self {
            id,
            payload,
            created_at: SystemTime::now(),
            status: ItemStatus::Pending,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_payload(self) -> T {
        self.payload
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// Move to `next`, which must be the immediate successor of the current status
    pub fn advance(&mut self, next: ItemStatus) -> Result<(), ItemError> {
        if self.status.successor() != Some(next) {
            return Err(ItemError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

impl<T: fmt::Debug> fmt::Display for Item<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Item(id={}, data={:?}, status={})",
            self.id, self.payload, self.status
        )
    }
}
