//! Queue consumer hosting the sync handler.

use std::sync::Arc;
use std::time::Duration;

use queue::{AbandonOutcome, Delivery, MessageQueue};
use read_model::ReadStore;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use write_store::CustomerStore;

use crate::handler::{DiscardReason, SyncHandler, SyncOutcome};

/// Concurrency and polling settings for [`SyncWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Upper bound on deliveries handled at the same time.
    pub max_concurrent_deliveries: usize,
    /// Pause between polls when the queue is empty.
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_deliveries: 16,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// What the worker did with a delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryResult {
    /// The message was handled and deleted from the queue.
    Completed(SyncOutcome),
    /// The handler failed transiently; the queue will deliver it again.
    Retrying { after: Duration },
    /// The handler failed on the last allowed attempt.
    DeadLettered,
}

/// Receives queue messages and runs the sync handler on each of them.
pub struct SyncWorker<Q, W, R> {
    queue: Arc<Q>,
    handler: Arc<SyncHandler<W, R>>,
    config: WorkerConfig,
}

impl<Q, W, R> SyncWorker<Q, W, R>
where
    Q: MessageQueue + 'static,
    W: CustomerStore + 'static,
    R: ReadStore + 'static,
{
    pub fn new(queue: Q, handler: SyncHandler<W, R>, config: WorkerConfig) -> Self {
        Self {
            queue: Arc::new(queue),
            handler: Arc::new(handler),
            config: WorkerConfig {
                max_concurrent_deliveries: config.max_concurrent_deliveries.max(1),
                ..config
            },
        }
    }

    /// Receives and handles at most one message inline.
    ///
    /// Returns `None` when no message is visible.
    pub async fn process_next(&self) -> queue::Result<Option<DeliveryResult>> {
        match self.queue.receive().await? {
            Some(delivery) => Ok(Some(
                process_delivery(self.queue.as_ref(), self.handler.as_ref(), delivery).await?,
            )),
            None => Ok(None),
        }
    }

    /// Consumes the queue until `shutdown` flips to true.
    ///
    /// In-flight deliveries are awaited before returning.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_deliveries));
        let mut in_flight = JoinSet::new();

        tracing::info!(
            max_concurrent_deliveries = self.config.max_concurrent_deliveries,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "sync worker started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            while let Some(joined) = in_flight.try_join_next() {
                if let Err(err) = joined {
                    tracing::error!(error = %err, "delivery task failed");
                }
            }

            let permit = tokio::select! {
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown.changed() => break,
            };

            let idle = match self.queue.receive().await {
                Ok(Some(delivery)) => {
                    let queue = Arc::clone(&self.queue);
                    let handler = Arc::clone(&self.handler);
                    in_flight.spawn(async move {
                        let _permit = permit;
                        let message_id = delivery.message_id;
                        let settled =
                            process_delivery(queue.as_ref(), handler.as_ref(), delivery).await;
                        if let Err(err) = settled {
                            tracing::warn!(%message_id, error = %err, "failed to settle delivery");
                        }
                    });
                    false
                }
                Ok(None) => true,
                Err(err) => {
                    tracing::error!(error = %err, "failed to receive from queue");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                    _ = shutdown.changed() => break,
                }
            }
        }

        let pending = in_flight.len();
        if pending > 0 {
            tracing::info!(pending, "waiting for in-flight deliveries");
        }
        while let Some(joined) = in_flight.join_next().await {
            if let Err(err) = joined {
                tracing::error!(error = %err, "delivery task failed");
            }
        }
        tracing::info!("sync worker stopped");
    }
}

async fn process_delivery<Q, W, R>(
    queue: &Q,
    handler: &SyncHandler<W, R>,
    delivery: Delivery,
) -> queue::Result<DeliveryResult>
where
    Q: MessageQueue + ?Sized,
    W: CustomerStore,
    R: ReadStore,
{
    let text = match delivery.text() {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(
                message_id = %delivery.message_id,
                error = %err,
                "discarding undecodable message"
            );
            metrics::counter!("sync_messages_total", "outcome" => "malformed").increment(1);
            queue.complete(&delivery).await?;
            return Ok(DeliveryResult::Completed(SyncOutcome::Discarded(
                DiscardReason::MalformedMessage {
                    payload: delivery.wire_body,
                },
            )));
        }
    };

    match handler.on_message(&text).await {
        Ok(outcome) => {
            queue.complete(&delivery).await?;
            Ok(DeliveryResult::Completed(outcome))
        }
        Err(failure) => {
            tracing::warn!(
                message_id = %delivery.message_id,
                dequeue_count = delivery.dequeue_count,
                error = %failure,
                "sync failed, returning message to queue"
            );
            match queue.abandon(&delivery).await? {
                AbandonOutcome::Redelivery { after } => Ok(DeliveryResult::Retrying { after }),
                AbandonOutcome::DeadLettered => Ok(DeliveryResult::DeadLettered),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use common::Country;
    use queue::{InMemoryQueue, QueueConfig};
    use read_model::InMemoryDocumentStore;
    use write_store::{InMemoryCustomerStore, NewCustomer};

    use super::*;
    use crate::error::Stage;

    struct Fixture {
        worker: SyncWorker<InMemoryQueue, InMemoryCustomerStore, InMemoryDocumentStore>,
        queue: InMemoryQueue,
        write_store: InMemoryCustomerStore,
        read_store: InMemoryDocumentStore,
    }

    fn fixture(config: QueueConfig) -> Fixture {
        let queue = InMemoryQueue::with_config(config);
        let write_store = InMemoryCustomerStore::new();
        let read_store = InMemoryDocumentStore::new();
        let worker = SyncWorker::new(
            queue.clone(),
            SyncHandler::new(write_store.clone(), read_store.clone()),
            WorkerConfig::default(),
        );
        Fixture {
            worker,
            queue,
            write_store,
            read_store,
        }
    }

    fn fast_queue() -> QueueConfig {
        QueueConfig {
            max_delivery_attempts: 3,
            visibility_timeout: Duration::from_secs(5),
            base_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(40),
        }
    }

    #[tokio::test]
    async fn empty_queue_yields_nothing() {
        let f = fixture(fast_queue());
        assert!(f.worker.process_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn completes_projected_message() {
        let f = fixture(fast_queue());
        let id = f
            .write_store
            .insert(&NewCustomer::new("Acme", "1-1", "Lima", Country::Peru))
            .await
            .unwrap();
        f.queue.send(&id.to_string()).await.unwrap();

        let result = f.worker.process_next().await.unwrap().unwrap();
        assert!(matches!(result, DeliveryResult::Completed(ref o) if o.is_projected()));
        assert_eq!(f.queue.len().await.unwrap(), 0);
        assert_eq!(f.read_store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn undecodable_body_is_completed() {
        let f = fixture(fast_queue());
        f.queue.send_raw("not base64!").await;

        let result = f.worker.process_next().await.unwrap().unwrap();
        assert_eq!(
            result,
            DeliveryResult::Completed(SyncOutcome::Discarded(DiscardReason::MalformedMessage {
                payload: "not base64!".to_string()
            }))
        );
        assert_eq!(f.queue.len().await.unwrap(), 0);
        assert_eq!(f.queue.dead_letter_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rejected_lookup_is_completed_without_retry() {
        let f = fixture(fast_queue());
        let id = f
            .write_store
            .insert(&NewCustomer::new("Acme", "1-1", "Lima", Country::Peru))
            .await
            .unwrap();
        f.write_store.reject_next_reads(1);
        f.queue.send(&id.to_string()).await.unwrap();

        let result = f.worker.process_next().await.unwrap().unwrap();
        assert!(matches!(
            result,
            DeliveryResult::Completed(SyncOutcome::Discarded(DiscardReason::Rejected {
                stage: Stage::WriteStore,
                ..
            }))
        ));
        assert_eq!(f.queue.len().await.unwrap(), 0);
        assert_eq!(f.queue.dead_letter_count().await.unwrap(), 0);
        assert_eq!(f.read_store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rejected_document_is_completed_without_retry() {
        let queue = InMemoryQueue::with_config(fast_queue());
        let write_store = InMemoryCustomerStore::new();
        let read_store = InMemoryDocumentStore::new().with_max_document_bytes(16);
        let worker = SyncWorker::new(
            queue.clone(),
            SyncHandler::new(write_store.clone(), read_store.clone()),
            WorkerConfig::default(),
        );
        let id = write_store
            .insert(&NewCustomer::new("Acme SAC 42", "12345678-3", "Lima", Country::Peru))
            .await
            .unwrap();
        queue.send(&id.to_string()).await.unwrap();

        let result = worker.process_next().await.unwrap().unwrap();
        assert!(matches!(
            result,
            DeliveryResult::Completed(SyncOutcome::Discarded(DiscardReason::Rejected {
                stage: Stage::ReadStore,
                ..
            }))
        ));
        assert_eq!(queue.len().await.unwrap(), 0);
        assert_eq!(queue.dead_letter_count().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_abandons_then_dead_letters() {
        let f = fixture(fast_queue());
        f.write_store.set_unavailable(true);
        f.queue.send("1").await.unwrap();

        let first = f.worker.process_next().await.unwrap().unwrap();
        assert_eq!(
            first,
            DeliveryResult::Retrying {
                after: Duration::from_millis(10)
            }
        );

        tokio::time::advance(Duration::from_millis(10)).await;
        let second = f.worker.process_next().await.unwrap().unwrap();
        assert_eq!(
            second,
            DeliveryResult::Retrying {
                after: Duration::from_millis(20)
            }
        );

        tokio::time::advance(Duration::from_millis(20)).await;
        let third = f.worker.process_next().await.unwrap().unwrap();
        assert_eq!(third, DeliveryResult::DeadLettered);
        assert_eq!(f.queue.dead_letter_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn run_drains_queue_and_stops_on_shutdown() {
        let f = fixture(fast_queue());
        for i in 0..20 {
            let id = f
                .write_store
                .insert(&NewCustomer::new(format!("Cliente {i}"), "1-1", "Lima", Country::Peru))
                .await
                .unwrap();
            f.queue.send(&id.to_string()).await.unwrap();
        }

        let (tx, rx) = watch::channel(false);
        let worker = Arc::new(f.worker);
        let handle = tokio::spawn({
            let worker = Arc::clone(&worker);
            async move { worker.run(rx).await }
        });

        for _ in 0..200 {
            if f.read_store.count().await.unwrap() == 20 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(f.read_store.count().await.unwrap(), 20);
        assert_eq!(f.queue.len().await.unwrap(), 0);
    }
}
