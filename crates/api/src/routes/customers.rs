//! Customer search, creation and resync endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{Country, CustomerId, CustomerProjection, NewCustomer};
use propagation::{CustomerProducer, ProducerError, QueryService};
use queue::MessageQueue;
use read_model::ReadStore;
use serde::{Deserialize, Serialize};
use write_store::CustomerStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<W, Q, R> {
    pub producer: CustomerProducer<W, Q>,
    pub query: QueryService<R>,
    pub queue: Q,
}

// -- Request types --

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(rename = "searchTerm")]
    pub search_term: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCustomerRequest {
    pub nombre: String,
    pub ruc: String,
    pub ciudad: String,
    pub pais: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct SearchResponse {
    #[serde(rename = "costoEnRUs")]
    pub request_charge: f64,
    #[serde(rename = "resultados")]
    pub results: Vec<CustomerProjection>,
}

#[derive(Serialize)]
pub struct CustomerCreatedResponse {
    pub id: String,
}

#[derive(Serialize)]
pub struct ResyncResponse {
    pub id: String,
    pub status: &'static str,
}

// -- Handlers --

/// GET /clientes/buscar: substring search over the read model.
#[tracing::instrument(skip(state, params))]
pub async fn search<W, Q, R>(
    State(state): State<Arc<AppState<W, Q, R>>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError>
where
    W: CustomerStore + 'static,
    Q: MessageQueue + 'static,
    R: ReadStore + 'static,
{
    let term = params
        .search_term
        .ok_or_else(|| ApiError::BadRequest("Query parameter 'searchTerm' is required".into()))?;

    let result = state.query.search(&term).await?;

    Ok(Json(SearchResponse {
        request_charge: result.charge.units(),
        results: result.matches,
    }))
}

/// POST /clientes: create a customer and queue it for sync.
#[tracing::instrument(skip(state, payload))]
pub async fn create<W, Q, R>(
    State(state): State<Arc<AppState<W, Q, R>>>,
    payload: Result<Json<CreateCustomerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CustomerCreatedResponse>), ApiError>
where
    W: CustomerStore + 'static,
    Q: MessageQueue + 'static,
    R: ReadStore + 'static,
{
    let Json(req) = payload?;
    let country: Country = req.pais.parse().map_err(ProducerError::Validation)?;
    let customer = NewCustomer::new(req.nombre, req.ruc, req.ciudad, country);

    let customer_id = state.producer.create_customer(customer).await?;

    Ok((
        StatusCode::CREATED,
        Json(CustomerCreatedResponse {
            id: customer_id.to_string(),
        }),
    ))
}

/// POST /clientes/{id}/resync: publish an existing customer again.
#[tracing::instrument(skip(state))]
pub async fn resync<W, Q, R>(
    State(state): State<Arc<AppState<W, Q, R>>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ResyncResponse>), ApiError>
where
    W: CustomerStore + 'static,
    Q: MessageQueue + 'static,
    R: ReadStore + 'static,
{
    let customer_id: CustomerId = id
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid customer id: {e}")))?;

    state.producer.republish(customer_id).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ResyncResponse {
            id: customer_id.to_string(),
            status: "queued",
        }),
    ))
}
