//! Shared types for the CQRS customer pipeline.
//!
//! The write model, the sync queue and the read model all speak in terms of
//! these types, so they live in a crate with no I/O dependencies.

pub mod charge;
pub mod customer;
pub mod types;

pub use charge::RequestCharge;
pub use customer::{
    Country, CustomerError, CustomerProjection, CustomerRecord, NewCustomer,
};
pub use types::{CustomerId, ParseCustomerIdError};
