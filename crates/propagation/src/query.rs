//! Query side: searches answered from the read model only.

use common::{CustomerProjection, RequestCharge};
use read_model::ReadStore;

/// Documents matching a search and the charge the store reported for it.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub matches: Vec<CustomerProjection>,
    pub charge: RequestCharge,
}

/// Substring search over the customer projections.
///
/// The write store is never consulted, so a customer becomes searchable
/// only once the sync handler has projected it.
#[derive(Clone)]
pub struct QueryService<R> {
    store: R,
}

impl<R: ReadStore> QueryService<R> {
    pub fn new(store: R) -> Self {
        Self { store }
    }

    /// Case-insensitive match of `term` against name, tax id and city.
    ///
    /// The term is trimmed first. An empty term matches every document.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, term: &str) -> read_model::Result<SearchResult> {
        let response = self.store.query_contains(term.trim()).await?;

        metrics::histogram!("search_request_charge").record(response.charge.units());
        tracing::info!(
            matches = response.documents.len(),
            charge = response.charge.units(),
            pages = response.pages,
            "search completed"
        );

        Ok(SearchResult {
            matches: response.documents,
            charge: response.charge,
        })
    }
}
