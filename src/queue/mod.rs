//! Bounded Hand-off Queues
//!
//! The queues are the only meeting point between producers and consumers.
//! Producers never wait on consumers directly (or vice versa); every wait is
//! a time-bounded push or pop on one of these queues.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐
//! │ Producer A │   │ Producer B │        fan-in: many producers, one queue
//! └─────┬──────┘   └─────┬──────┘
//!       │ push_timeout   │ push_timeout
//!       ▼                ▼
//! ┌──────────────────────────────┐
//! │ HandoffQueue "main" (cap N)  │  Pending ──► InQueue at insertion
//! │  ┌───┬───┬───┬───┐           │
//! │  │ 0 │ 1 │ 0 │...│           │  unfinished counter ──► drain barrier
//! │  └───┴───┴───┴───┘           │
//! └──────────────┬───────────────┘
//!                │ pop_acknowledged (TaskAck releases the item)
//!                ▼
//!         ┌────────────┐
//!         │  Consumer  │ ──► Destination (InQueue ──► Consumed)
//!         └────────────┘
//! ```
//!
//! Ownership of an [`Item`] moves into the queue on push and out of it on pop,
//! so at any instant exactly one worker can touch it.

mod bounded;
mod error;
mod item;

pub use bounded::{HandoffQueue, QueueSnapshot, TaskAck};
pub use error::{QueueError, QueueResult};
pub use item::{Item, ItemError, ItemStatus};
