//! Read model for the CQRS query side.
//!
//! This crate provides:
//! - [`ReadStore`] trait for the denormalized customer documents
//! - [`InMemoryDocumentStore`], a partitioned document store keyed by country
//! - [`ChargeModel`], the request-charge accounting the store reports

pub mod charge;
pub mod error;
pub mod memory;
pub mod store;

pub use charge::ChargeModel;
pub use common::{CustomerProjection, RequestCharge};
pub use error::{ReadStoreError, Result};
pub use memory::InMemoryDocumentStore;
pub use store::{QueryResponse, ReadStore};
