use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    CustomerId, CustomerRecord, NewCustomer, Result, WriteStoreError, store::CustomerStore,
};

#[derive(Default)]
struct Rows {
    rows: BTreeMap<CustomerId, CustomerRecord>,
    last_id: i64,
}

/// In-memory customer store implementation for testing.
///
/// Identifiers are assigned sequentially from 1, like an identity column.
/// Failures can be injected to exercise the sync handler's transient path.
#[derive(Clone, Default)]
pub struct InMemoryCustomerStore {
    state: Arc<RwLock<Rows>>,
    unavailable: Arc<AtomicBool>,
    failing_reads: Arc<AtomicUsize>,
    rejected_reads: Arc<AtomicUsize>,
}

impl InMemoryCustomerStore {
    /// Creates a new empty in-memory customer store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation fail with `Unavailable` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes the next `count` lookups fail with `Unavailable`.
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` lookups fail with a row decode error, which
    /// retrying does not fix.
    pub fn reject_next_reads(&self, count: usize) {
        self.rejected_reads.store(count, Ordering::SeqCst);
    }

    /// Stores a row as-is, bypassing input validation.
    ///
    /// Lets tests seed rows other tools could have written, such as one
    /// without a country.
    pub async fn insert_raw(
        &self,
        name: &str,
        tax_id: Option<&str>,
        city: Option<&str>,
        country: Option<&str>,
    ) -> CustomerId {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let id = CustomerId::new(state.last_id);
        state.rows.insert(
            id,
            CustomerRecord {
                id,
                name: name.to_string(),
                tax_id: tax_id.map(String::from),
                city: city.map(String::from),
                country: country.map(String::from),
            },
        );
        id
    }

    /// Overwrites the country of an existing row.
    pub async fn set_country(&self, id: CustomerId, country: Option<&str>) -> bool {
        let mut state = self.state.write().await;
        match state.rows.get_mut(&id) {
            Some(row) => {
                row.country = country.map(String::from);
                true
            }
            None => false,
        }
    }

    /// Deletes a row, returning whether it existed.
    pub async fn delete(&self, id: CustomerId) -> bool {
        self.state.write().await.rows.remove(&id).is_some()
    }

    /// Returns the number of rows stored.
    pub async fn count(&self) -> usize {
        self.state.read().await.rows.len()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(WriteStoreError::Unavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        Ok(())
    }

    fn take_read_failure(&self) -> Option<WriteStoreError> {
        if take_one(&self.rejected_reads) {
            return Some(WriteStoreError::Database(sqlx::Error::ColumnNotFound(
                "pais".to_string(),
            )));
        }
        if take_one(&self.failing_reads) {
            return Some(WriteStoreError::Unavailable(
                "injected read failure".to_string(),
            ));
        }
        None
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn insert(&self, customer: &NewCustomer) -> Result<CustomerId> {
        self.check_available()?;
        if customer.name.trim().is_empty() {
            return Err(WriteStoreError::Constraint(
                "clientes_nombre_not_blank".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        state.last_id += 1;
        let id = CustomerId::new(state.last_id);
        state.rows.insert(
            id,
            CustomerRecord {
                id,
                name: customer.name.clone(),
                tax_id: Some(customer.tax_id.clone()),
                city: Some(customer.city.clone()),
                country: Some(customer.country.to_string()),
            },
        );
        Ok(id)
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<CustomerRecord>> {
        self.check_available()?;
        if let Some(err) = self.take_read_failure() {
            return Err(err);
        }
        Ok(self.state.read().await.rows.get(&id).cloned())
    }
}
