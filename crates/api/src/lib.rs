//! HTTP API server with observability for the customer pipeline.
//!
//! Provides the customer search, creation and resync endpoints, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use propagation::{CustomerProducer, QueryService, SyncHandler, SyncWorker, WorkerConfig};
use queue::MessageQueue;
use read_model::ReadStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use write_store::CustomerStore;

use routes::customers::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<W, Q, R>(state: Arc<AppState<W, Q, R>>, metrics_handle: PrometheusHandle) -> Router
where
    W: CustomerStore + 'static,
    Q: MessageQueue + 'static,
    R: ReadStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<W, Q, R>))
        .route("/clientes", post(routes::customers::create::<W, Q, R>))
        .route("/clientes/buscar", get(routes::customers::search::<W, Q, R>))
        .route(
            "/clientes/{id}/resync",
            post(routes::customers::resync::<W, Q, R>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the producer, query service and sync worker over shared stores.
pub fn create_default_state<W, Q, R>(
    write_store: W,
    queue: Q,
    read_store: R,
    worker_config: WorkerConfig,
) -> (Arc<AppState<W, Q, R>>, Arc<SyncWorker<Q, W, R>>)
where
    W: CustomerStore + Clone + 'static,
    Q: MessageQueue + Clone + 'static,
    R: ReadStore + Clone + 'static,
{
    let producer = CustomerProducer::new(write_store.clone(), queue.clone());
    let query = QueryService::new(read_store.clone());
    let handler = SyncHandler::new(write_store, read_store);
    let worker = Arc::new(SyncWorker::new(queue.clone(), handler, worker_config));

    let state = Arc::new(AppState {
        producer,
        query,
        queue,
    });
    (state, worker)
}
