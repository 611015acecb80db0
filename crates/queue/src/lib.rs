//! Message queue between the producer and the sync handler.
//!
//! Delivery is at-least-once: a received message stays leased for the
//! visibility timeout and comes back unless it is completed. Abandoned
//! messages return after an exponential backoff, and messages that keep
//! failing are moved to a poison store.

pub mod codec;
pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod queue;

pub use config::QueueConfig;
pub use error::{QueueError, Result};
pub use memory::{DeadLetter, InMemoryQueue};
pub use postgres::PostgresQueue;
pub use queue::{AbandonOutcome, Delivery, MessageId, MessageQueue};
