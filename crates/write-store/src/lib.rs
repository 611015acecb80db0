pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{Country, CustomerId, CustomerRecord, NewCustomer};
pub use error::{Result, WriteStoreError};
pub use memory::InMemoryCustomerStore;
pub use postgres::PostgresCustomerStore;
pub use store::{CustomerStore, CustomerStoreExt};
