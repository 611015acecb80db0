use async_trait::async_trait;

use crate::{CustomerId, CustomerRecord, NewCustomer, Result};

/// Core trait for write store implementations.
///
/// The write store owns customer identity: `insert` is the only way an
/// identifier comes into existence. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Appends a customer row and returns its generated identifier.
    async fn insert(&self, customer: &NewCustomer) -> Result<CustomerId>;

    /// Looks up the authoritative row for an identifier.
    ///
    /// Returns None if no such row exists.
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<CustomerRecord>>;
}

/// Extension trait providing convenience methods for customer stores.
#[async_trait]
pub trait CustomerStoreExt: CustomerStore {
    /// Checks if a customer row exists.
    async fn exists(&self, id: CustomerId) -> Result<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }
}

impl<T: CustomerStore + ?Sized> CustomerStoreExt for T {}
