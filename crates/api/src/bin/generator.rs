//! Operator tool that creates random customers through the producer.
//!
//! With `DATABASE_URL` set it writes to Postgres and the running API
//! process picks the messages up. Without it everything stays in memory and
//! the sync worker runs inline, so each customer is projected right away.

use std::io::{BufRead, Write};
use std::time::Duration;

use api::config::Config;
use async_trait::async_trait;
use clap::Parser;
use common::{CustomerId, NewCustomer};
use propagation::{
    CustomerGenerator, CustomerProducer, DeliveryResult, GenerationConfig, GenerationHooks,
    ProducerError, SyncHandler, SyncOutcome, SyncWorker, generate_customers,
};
use queue::{InMemoryQueue, MessageQueue, PostgresQueue};
use read_model::InMemoryDocumentStore;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use write_store::{CustomerStore, InMemoryCustomerStore, PostgresCustomerStore};

/// Generate random customers and queue them for propagation.
#[derive(Debug, Parser)]
#[command(name = "generator", version)]
struct Args {
    /// Number of customers to create. Ignored with `--interactive`.
    #[arg(long, default_value_t = 10)]
    count: u64,

    /// Pause between two customers, in milliseconds.
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,

    /// Wait for Enter before each customer until `salir` or `exit` is typed.
    #[arg(long)]
    interactive: bool,

    /// Seed for reproducible customers.
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received SIGINT, stopping after the current customer");
        let _ = shutdown_tx.send(true);
    });

    match config.database_url.clone() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(2)
                .connect(&url)
                .await
                .expect("failed to connect to Postgres");
            let store = PostgresCustomerStore::new(pool.clone());
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            let queue = PostgresQueue::with_config(pool, config.queue);
            generate(&args, store, queue, None, shutdown_rx).await;
        }
        None => {
            let store = InMemoryCustomerStore::new();
            let queue = InMemoryQueue::with_config(config.queue);
            let worker = SyncWorker::new(
                queue.clone(),
                SyncHandler::new(store.clone(), InMemoryDocumentStore::new()),
                config.worker,
            );
            generate(&args, store, queue, Some(worker), shutdown_rx).await;
        }
    }
}

/// Prints each customer and, in memory mode, projects it right away.
struct Console<Q, W> {
    interactive: bool,
    inline_worker: Option<SyncWorker<Q, W, InMemoryDocumentStore>>,
}

#[async_trait]
impl<Q, W> GenerationHooks for Console<Q, W>
where
    Q: MessageQueue + 'static,
    W: CustomerStore + 'static,
{
    async fn before_next(&mut self) -> bool {
        !self.interactive || wait_for_enter().await
    }

    async fn on_result(
        &mut self,
        customer: &NewCustomer,
        result: &Result<CustomerId, ProducerError>,
    ) {
        println!(
            "Generating customer: {} in {}, {}",
            customer.name, customer.city, customer.country
        );
        match result {
            Ok(customer_id) => println!("Created customer {customer_id} and queued it for sync"),
            Err(err) => println!("Error: {err}"),
        }

        if let Some(worker) = &self.inline_worker {
            match worker.process_next().await {
                Ok(Some(DeliveryResult::Completed(SyncOutcome::Projected {
                    customer_id,
                    partition_key,
                    charge,
                }))) => println!("Projected customer {customer_id} into {partition_key} ({charge})"),
                Ok(Some(other)) => println!("Sync result: {other:?}"),
                Ok(None) => {}
                Err(err) => tracing::error!(error = %err, "inline sync failed"),
            }
        }
        println!("---");
    }
}

async fn generate<W, Q>(
    args: &Args,
    store: W,
    queue: Q,
    inline_worker: Option<SyncWorker<Q, W, InMemoryDocumentStore>>,
    shutdown: watch::Receiver<bool>,
) where
    W: CustomerStore + Clone + 'static,
    Q: MessageQueue + Clone + 'static,
{
    let producer = CustomerProducer::new(store, queue);
    let mut generator = match args.seed {
        Some(seed) => CustomerGenerator::seeded(seed),
        None => CustomerGenerator::new(),
    };
    let config = GenerationConfig {
        limit: (!args.interactive).then_some(args.count),
        interval: if args.interactive {
            Duration::ZERO
        } else {
            Duration::from_millis(args.interval_ms)
        },
    };
    let mut console = Console {
        interactive: args.interactive,
        inline_worker,
    };

    println!("Generating customers. Press Ctrl-C to stop.");
    let report =
        generate_customers(&producer, &mut generator, config, &mut console, shutdown).await;
    println!(
        "Done: {} created, {} failed.",
        report.created.len(),
        report.failed
    );
}

/// Returns false when the operator asked to quit or stdin closed.
async fn wait_for_enter() -> bool {
    print!("Press Enter to create a customer, or type 'salir' to quit: ");
    let _ = std::io::stdout().flush();

    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).map(|n| (n, line))
    })
    .await;

    match line {
        Ok(Ok((0, _))) => false,
        Ok(Ok((_, line))) => {
            let input = line.trim().to_lowercase();
            input != "salir" && input != "exit"
        }
        _ => false,
    }
}
