//! Eventual-consistency pipeline from the write store to the read store.
//!
//! - [`CustomerProducer`] persists a customer and publishes its identifier
//! - [`SyncHandler`] turns one queue message into one read-model upsert
//! - [`SyncWorker`] hosts the handler as a concurrent queue consumer
//! - [`QueryService`] answers searches from the read store only

pub mod error;
pub mod generation;
pub mod generator;
pub mod handler;
pub mod producer;
pub mod query;
pub mod worker;

pub use error::{ProducerError, Stage, TransientFailure};
pub use generation::{GenerationConfig, GenerationHooks, GenerationReport, generate_customers};
pub use generator::CustomerGenerator;
pub use handler::{DiscardReason, SyncHandler, SyncOutcome};
pub use producer::CustomerProducer;
pub use query::{QueryService, SearchResult};
pub use worker::{DeliveryResult, SyncWorker, WorkerConfig};
