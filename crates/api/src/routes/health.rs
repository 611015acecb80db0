//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use queue::MessageQueue;
use read_model::ReadStore;
use serde::Serialize;
use write_store::CustomerStore;

use crate::routes::customers::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Messages waiting for the sync worker, when the queue answered.
    pub pending_sync: Option<usize>,
    pub dead_lettered: Option<usize>,
}

/// GET /health: liveness plus the sync backlog.
pub async fn check<W, Q, R>(State(state): State<Arc<AppState<W, Q, R>>>) -> Json<HealthResponse>
where
    W: CustomerStore + 'static,
    Q: MessageQueue + 'static,
    R: ReadStore + 'static,
{
    let pending_sync = state.queue.len().await.ok();
    let dead_lettered = state.queue.dead_letter_count().await.ok();

    if let Some(pending) = pending_sync {
        metrics::gauge!("sync_queue_depth").set(pending as f64);
    }
    if let Some(poison) = dead_lettered {
        metrics::gauge!("sync_dead_letters").set(poison as f64);
    }

    Json(HealthResponse {
        status: "ok",
        pending_sync,
        dead_lettered,
    })
}
