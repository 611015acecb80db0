//! Producer: the write side of the pipeline.

use common::{CustomerId, NewCustomer};
use queue::MessageQueue;
use write_store::{CustomerStore, CustomerStoreExt};

use crate::error::ProducerError;

/// Persists customers and publishes their identifiers for propagation.
///
/// The insert and the publish are two separate steps. When the publish
/// fails the row stays, and the caller gets `PropagationGap` carrying the
/// identifier so the gap can be closed with [`CustomerProducer::republish`].
#[derive(Clone)]
pub struct CustomerProducer<W, Q> {
    store: W,
    queue: Q,
}

impl<W: CustomerStore, Q: MessageQueue> CustomerProducer<W, Q> {
    pub fn new(store: W, queue: Q) -> Self {
        Self { store, queue }
    }

    /// Creates a customer and enqueues its identifier.
    #[tracing::instrument(skip(self, customer), fields(name = %customer.name, country = %customer.country))]
    pub async fn create_customer(&self, customer: NewCustomer) -> Result<CustomerId, ProducerError> {
        customer.validate()?;

        let customer_id = self.store.insert(&customer).await.map_err(|err| {
            tracing::error!(error = %err, "failed to persist customer");
            ProducerError::Persistence(err)
        })?;

        self.publish(customer_id).await?;

        metrics::counter!("producer_customers_created_total").increment(1);
        tracing::info!(%customer_id, "customer created and queued for sync");
        Ok(customer_id)
    }

    /// Publishes the identifier of an existing customer again.
    #[tracing::instrument(skip(self))]
    pub async fn republish(&self, customer_id: CustomerId) -> Result<(), ProducerError> {
        if !self.store.exists(customer_id).await? {
            return Err(ProducerError::NotFound(customer_id));
        }

        self.publish(customer_id).await?;
        tracing::info!(%customer_id, "customer queued for resync");
        Ok(())
    }

    async fn publish(&self, customer_id: CustomerId) -> Result<(), ProducerError> {
        match self.queue.send(&customer_id.to_string()).await {
            Ok(message_id) => {
                tracing::debug!(%customer_id, %message_id, "sync message sent");
                Ok(())
            }
            Err(source) => {
                metrics::counter!("producer_propagation_gaps_total").increment(1);
                tracing::error!(
                    %customer_id,
                    error = %source,
                    "customer persisted but sync message was not sent"
                );
                Err(ProducerError::PropagationGap {
                    customer_id,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use common::{Country, CustomerError};
    use queue::InMemoryQueue;
    use write_store::InMemoryCustomerStore;

    use super::*;

    fn producer() -> (
        CustomerProducer<InMemoryCustomerStore, InMemoryQueue>,
        InMemoryCustomerStore,
        InMemoryQueue,
    ) {
        let store = InMemoryCustomerStore::new();
        let queue = InMemoryQueue::new();
        (
            CustomerProducer::new(store.clone(), queue.clone()),
            store,
            queue,
        )
    }

    fn acme() -> NewCustomer {
        NewCustomer::new("Acme SAC 42", "12345678-3", "Lima", Country::Peru)
    }

    #[tokio::test]
    async fn create_persists_and_publishes_id() {
        let (producer, store, queue) = producer();

        let id = producer.create_customer(acme()).await.unwrap();

        assert!(store.find_by_id(id).await.unwrap().is_some());
        assert_eq!(queue.pending_bodies().await, vec![id.to_string()]);
    }

    #[tokio::test]
    async fn invalid_input_writes_nothing() {
        let (producer, store, queue) = producer();

        let err = producer
            .create_customer(NewCustomer::new(" ", "1-1", "Lima", Country::Peru))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProducerError::Validation(CustomerError::EmptyField("name"))
        ));
        assert_eq!(store.count().await, 0);
        assert_eq!(queue.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn persistence_failure_publishes_nothing() {
        let (producer, store, queue) = producer();
        store.set_unavailable(true);

        let err = producer.create_customer(acme()).await.unwrap_err();

        assert!(matches!(err, ProducerError::Persistence(_)));
        assert_eq!(queue.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn publish_failure_is_a_propagation_gap() {
        let (producer, store, queue) = producer();
        queue.set_fail_on_send(true);

        let err = producer.create_customer(acme()).await.unwrap_err();

        let ProducerError::PropagationGap { customer_id, .. } = err else {
            panic!("expected PropagationGap, got {err:?}");
        };
        assert!(store.find_by_id(customer_id).await.unwrap().is_some());
        assert_eq!(queue.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn republish_closes_a_gap() {
        let (producer, _, queue) = producer();
        queue.set_fail_on_send(true);
        let Err(ProducerError::PropagationGap { customer_id, .. }) =
            producer.create_customer(acme()).await
        else {
            panic!("expected PropagationGap");
        };

        queue.set_fail_on_send(false);
        producer.republish(customer_id).await.unwrap();

        assert_eq!(queue.pending_bodies().await, vec![customer_id.to_string()]);
    }

    #[tokio::test]
    async fn republish_unknown_customer() {
        let (producer, _, queue) = producer();

        let err = producer.republish(CustomerId::new(99)).await.unwrap_err();

        assert!(matches!(err, ProducerError::NotFound(id) if id == CustomerId::new(99)));
        assert_eq!(queue.len().await.unwrap(), 0);
    }
}
