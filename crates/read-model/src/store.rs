//! Core read store trait.

use async_trait::async_trait;
use common::{CustomerProjection, RequestCharge};

use crate::Result;

/// Documents returned by a query together with what the query cost.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    pub documents: Vec<CustomerProjection>,
    /// Sum of the charges of every page read.
    pub charge: RequestCharge,
    /// Number of pages the store needed to return the documents.
    pub pages: usize,
}

/// A document store holding customer projections.
///
/// Documents are grouped into partitions by `pais` and addressed by `id`.
/// A document key is unique across partitions.
#[async_trait]
pub trait ReadStore: Send + Sync {
    /// Creates or fully replaces the document with the same `id`.
    ///
    /// Upserting identical content again leaves the store unchanged.
    async fn upsert(&self, document: CustomerProjection) -> Result<RequestCharge>;

    /// Point read of one document inside its partition.
    async fn get(&self, id: &str, partition_key: &str) -> Result<Option<CustomerProjection>>;

    /// Cross-partition scan for documents whose name, tax id or city
    /// contains `term`, ignoring case.
    async fn query_contains(&self, term: &str) -> Result<QueryResponse>;

    /// Returns the number of documents stored.
    async fn count(&self) -> Result<usize>;
}
