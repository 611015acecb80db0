//! Generation loop: feeds random customers through the producer until told to stop.

use std::time::Duration;

use async_trait::async_trait;
use common::{CustomerId, NewCustomer};
use queue::MessageQueue;
use tokio::sync::watch;
use write_store::CustomerStore;

use crate::error::ProducerError;
use crate::generator::CustomerGenerator;
use crate::producer::CustomerProducer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Stop after this many attempts. `None` runs until shutdown.
    pub limit: Option<u64>,
    /// Pause between two customers.
    pub interval: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            limit: Some(10),
            interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub created: Vec<CustomerId>,
    pub failed: u64,
}

impl GenerationReport {
    pub fn attempted(&self) -> u64 {
        self.created.len() as u64 + self.failed
    }
}

/// Per-iteration callbacks for the generation loop.
#[async_trait]
pub trait GenerationHooks: Send {
    /// Called before each customer. Returning false ends the run.
    async fn before_next(&mut self) -> bool {
        true
    }

    /// Called once the customer has been persisted and published, or has failed.
    async fn on_result(
        &mut self,
        _customer: &NewCustomer,
        _result: &Result<CustomerId, ProducerError>,
    ) {
    }
}

#[async_trait]
impl GenerationHooks for () {}

/// Creates customers one insert-and-publish pair at a time.
///
/// Shutdown is checked between pairs only, so every created row has had
/// its publish attempted before the loop returns.
#[tracing::instrument(skip_all, fields(limit = ?config.limit))]
pub async fn generate_customers<W, Q, H>(
    producer: &CustomerProducer<W, Q>,
    generator: &mut CustomerGenerator,
    config: GenerationConfig,
    hooks: &mut H,
    mut shutdown: watch::Receiver<bool>,
) -> GenerationReport
where
    W: CustomerStore,
    Q: MessageQueue,
    H: GenerationHooks,
{
    let mut report = GenerationReport::default();

    while config.limit.is_none_or(|limit| report.attempted() < limit) {
        if *shutdown.borrow() || !hooks.before_next().await || *shutdown.borrow() {
            break;
        }

        let customer = generator.next_customer();
        let result = producer.create_customer(customer.clone()).await;
        match &result {
            Ok(customer_id) => report.created.push(*customer_id),
            Err(err) => {
                report.failed += 1;
                tracing::error!(error = %err, "failed to create customer");
            }
        }
        hooks.on_result(&customer, &result).await;

        if !config.interval.is_zero() {
            tokio::select! {
                () = tokio::time::sleep(config.interval) => {}
                Ok(()) = shutdown.changed() => {}
            }
        }
    }

    tracing::info!(
        created = report.created.len(),
        failed = report.failed,
        "generation finished"
    );
    report
}
