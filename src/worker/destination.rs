//! Shared append-only destination for consumed items

use crate::core::sync::handle_mutex_poison;
use crate::queue::Item;
use crate::system::{SystemError, SystemResult};
use std::sync::{Arc, Mutex};

/// Append-only list of consumed items, shareable between consumers
///
/// Cloning yields another handle to the same list. Appends are serialised by
/// the destination's own lock, independent of any queue lock.
///
/// # Example
///
/// ```rust
/// use handoff::worker::Destination;
///
/// let destination: Destination<String> = Destination::new();
/// let shared = destination.clone();
/// assert_eq!(shared.len(), 0);
/// ```
pub struct Destination<T> {
    items: Arc<Mutex<Vec<Item<T>>>>,
}

impl<T> Destination<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append one item, returning the new length.
    pub fn append(&self, item: Item<T>) -> SystemResult<usize> {
        let mut items = handle_mutex_poison(self.items.lock(), |message| SystemError::Poisoned {
            resource: "destination".to_string(),
            message,
        })?;
        items.push(item);
        Ok(items.len())
    }

    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` over the items appended so far, under the destination lock.
    pub fn with_items<R>(&self, f: impl FnOnce(&[Item<T>]) -> R) -> R {
        let items = self
            .items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&items)
    }

    /// Remove and return everything appended so far.
    pub fn take_all(&self) -> Vec<Item<T>> {
        let mut items = self
            .items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *items)
    }

    /// True if both handles point at the same underlying list
    pub fn same_as(&self, other: &Destination<T>) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

impl<T: Clone> Destination<T> {
    pub fn snapshot(&self) -> Vec<Item<T>> {
        self.with_items(|items| items.to_vec())
    }
}

impl<T> Clone for Destination<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for Destination<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Destination<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Destination")
            .field("len", &self.len())
            .finish()
    }
}
