use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{CustomerProjection, RequestCharge};
use tokio::sync::RwLock;

use crate::store::{QueryResponse, ReadStore};
use crate::{ChargeModel, ReadStoreError, Result};

const DEFAULT_PAGE_SIZE: usize = 100;
const DEFAULT_MAX_DOCUMENT_BYTES: usize = 2 * 1024 * 1024;

#[derive(Default)]
struct Partitions {
    /// Partition key -> document key -> document.
    documents: BTreeMap<String, BTreeMap<String, CustomerProjection>>,
    /// Document key -> partition key, keeps keys unique across partitions.
    locations: HashMap<String, String>,
}

impl Partitions {
    fn len(&self) -> usize {
        self.locations.len()
    }
}

/// In-memory partitioned document store.
///
/// Queries scan partitions in key order and documents in key order within
/// each partition, in pages of `page_size` scanned documents.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    partitions: Arc<RwLock<Partitions>>,
    charges: ChargeModel,
    page_size: usize,
    max_document_bytes: usize,
    throttle_millis: Arc<AtomicU64>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store with the default charge model.
    pub fn new() -> Self {
        Self::with_charge_model(ChargeModel::default())
    }

    pub fn with_charge_model(charges: ChargeModel) -> Self {
        Self {
            partitions: Arc::new(RwLock::new(Partitions::default())),
            charges,
            page_size: DEFAULT_PAGE_SIZE,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            throttle_millis: Arc::new(AtomicU64::new(0)),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sets how many documents a single query page scans.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the largest serialized document `upsert` accepts.
    pub fn with_max_document_bytes(mut self, max_document_bytes: usize) -> Self {
        self.max_document_bytes = max_document_bytes;
        self
    }

    /// Makes every operation fail with `Throttled` while set.
    pub fn set_throttled(&self, retry_after: Option<Duration>) {
        let millis = retry_after.map_or(0, |d| (d.as_millis() as u64).max(1));
        self.throttle_millis.store(millis, Ordering::SeqCst);
    }

    /// Makes every operation fail with `Unavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns every document in a partition, in key order.
    pub async fn partition(&self, partition_key: &str) -> Vec<CustomerProjection> {
        self.partitions
            .read()
            .await
            .documents
            .get(partition_key)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns every document, in scan order.
    pub async fn snapshot(&self) -> Vec<CustomerProjection> {
        self.partitions
            .read()
            .await
            .documents
            .values()
            .flat_map(|docs| docs.values().cloned())
            .collect()
    }

    /// Clears all documents.
    pub async fn reset(&self) {
        let mut partitions = self.partitions.write().await;
        partitions.documents.clear();
        partitions.locations.clear();
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ReadStoreError::Unavailable(
                "document store is not reachable".to_string(),
            ));
        }
        let millis = self.throttle_millis.load(Ordering::SeqCst);
        if millis > 0 {
            return Err(ReadStoreError::Throttled {
                retry_after: Duration::from_millis(millis),
            });
        }
        Ok(())
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadStore for InMemoryDocumentStore {
    async fn upsert(&self, document: CustomerProjection) -> Result<RequestCharge> {
        self.check_available()?;

        if document.id.trim().is_empty() {
            return Err(ReadStoreError::InvalidDocument(
                "document id is empty".to_string(),
            ));
        }
        if document.pais.trim().is_empty() {
            return Err(ReadStoreError::InvalidDocument(format!(
                "document {} has no partition key",
                document.id
            )));
        }

        let size = serde_json::to_vec(&document)?.len();
        if size > self.max_document_bytes {
            return Err(ReadStoreError::InvalidDocument(format!(
                "document {} is {size} bytes, limit is {}",
                document.id, self.max_document_bytes
            )));
        }
        let charge = self.charges.write(size);

        let mut partitions = self.partitions.write().await;
        let previous = partitions
            .locations
            .insert(document.id.clone(), document.pais.clone());

        // A country change moves the document, the old copy must go.
        if let Some(old_partition) = previous
            && old_partition != document.pais
            && let Some(docs) = partitions.documents.get_mut(&old_partition)
        {
            docs.remove(&document.id);
            if docs.is_empty() {
                partitions.documents.remove(&old_partition);
            }
        }

        partitions
            .documents
            .entry(document.pais.clone())
            .or_default()
            .insert(document.id.clone(), document);

        Ok(charge)
    }

    async fn get(&self, id: &str, partition_key: &str) -> Result<Option<CustomerProjection>> {
        self.check_available()?;
        Ok(self
            .partitions
            .read()
            .await
            .documents
            .get(partition_key)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn query_contains(&self, term: &str) -> Result<QueryResponse> {
        self.check_available()?;

        let needle = term.to_lowercase();
        let partitions = self.partitions.read().await;
        let all: Vec<&CustomerProjection> = partitions
            .documents
            .values()
            .flat_map(|docs| docs.values())
            .collect();

        let mut response = QueryResponse::default();
        if all.is_empty() {
            response.pages = 1;
            response.charge = self.charges.query_page(0, 0);
            return Ok(response);
        }

        for page in all.chunks(self.page_size) {
            let matched: Vec<CustomerProjection> = page
                .iter()
                .filter(|doc| doc.matches_lowercase(&needle))
                .map(|doc| (*doc).clone())
                .collect();
            response.charge += self.charges.query_page(page.len(), matched.len());
            response.pages += 1;
            response.documents.extend(matched);
        }

        tracing::debug!(
            term,
            scanned = all.len(),
            returned = response.documents.len(),
            pages = response.pages,
            "cross-partition query"
        );
        Ok(response)
    }

    async fn count(&self) -> Result<usize> {
        self.check_available()?;
        Ok(self.partitions.read().await.len())
    }
}
