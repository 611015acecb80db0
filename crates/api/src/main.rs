//! API server entry point.

use api::config::{Config, LogFormat};
use metrics_exporter_prometheus::PrometheusHandle;
use queue::{InMemoryQueue, MessageQueue, PostgresQueue};
use read_model::InMemoryDocumentStore;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use write_store::{CustomerStore, InMemoryCustomerStore, PostgresCustomerStore};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Runs the HTTP server and the sync worker until a shutdown signal arrives.
async fn serve<W, Q>(config: Config, write_store: W, queue: Q, metrics_handle: PrometheusHandle)
where
    W: CustomerStore + Clone + 'static,
    Q: MessageQueue + Clone + 'static,
{
    let read_store = InMemoryDocumentStore::new();
    let (state, worker) =
        api::create_default_state(write_store, queue, read_store, config.worker);
    let app = api::create_app(state, metrics_handle);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_task = tokio::spawn({
        let shutdown_rx = shutdown_rx.clone();
        async move { worker.run(shutdown_rx).await }
    });

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");

    let mut server_shutdown = shutdown_rx;
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = server_shutdown.changed().await;
    });

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    server.await.expect("server error");
    if let Err(err) = worker_task.await {
        tracing::error!(error = %err, "sync worker task failed");
    }

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the write store and queue backends, then serve
    match config.database_url.clone() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(&url)
                .await
                .expect("failed to connect to Postgres");
            let write_store = PostgresCustomerStore::new(pool.clone());
            write_store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            let queue = PostgresQueue::with_config(pool, config.queue);
            tracing::info!("using Postgres write store and queue");
            serve(config, write_store, queue, metrics_handle).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, running fully in memory");
            let queue = InMemoryQueue::with_config(config.queue);
            serve(config, InMemoryCustomerStore::new(), queue, metrics_handle).await;
        }
    }
}
