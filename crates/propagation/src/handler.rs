//! Sync handler: one queue message in, at most one read-model upsert out.

use common::{CustomerId, CustomerProjection, RequestCharge};
use read_model::ReadStore;
use write_store::CustomerStore;

use crate::error::{Stage, TransientFailure};

/// Why a message was consumed without updating the read model.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscardReason {
    /// The payload is not a decimal customer identifier.
    MalformedMessage { payload: String },
    /// The identifier refers to a row that no longer exists.
    StaleReference { customer_id: CustomerId },
    /// The row has no country, so it has no partition key.
    IncompleteRecord { customer_id: CustomerId },
    /// A store refused the operation and retrying will not change that.
    Rejected { stage: Stage, message: String },
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscardReason::MalformedMessage { payload } => {
                write!(f, "malformed message {payload:?}")
            }
            DiscardReason::StaleReference { customer_id } => {
                write!(f, "customer {customer_id} no longer exists")
            }
            DiscardReason::IncompleteRecord { customer_id } => {
                write!(f, "customer {customer_id} has no country")
            }
            DiscardReason::Rejected { stage, message } => {
                write!(f, "{stage} rejected the operation: {message}")
            }
        }
    }
}

/// Terminal result of handling one message. Either way the message is done.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Projected {
        customer_id: CustomerId,
        partition_key: String,
        charge: RequestCharge,
    },
    Discarded(DiscardReason),
}

impl SyncOutcome {
    /// Label used for the `outcome` metric dimension.
    pub fn label(&self) -> &'static str {
        match self {
            SyncOutcome::Projected { .. } => "projected",
            SyncOutcome::Discarded(DiscardReason::MalformedMessage { .. }) => "malformed",
            SyncOutcome::Discarded(DiscardReason::StaleReference { .. }) => "stale",
            SyncOutcome::Discarded(DiscardReason::IncompleteRecord { .. }) => "incomplete",
            SyncOutcome::Discarded(DiscardReason::Rejected { .. }) => "rejected",
        }
    }

    pub fn is_projected(&self) -> bool {
        matches!(self, SyncOutcome::Projected { .. })
    }
}

/// Re-reads the authoritative row for a message and upserts its projection.
///
/// The handler keeps no state between messages. Running it concurrently,
/// including on duplicates of the same identifier, converges because the
/// upsert replaces the whole document with the current row.
#[derive(Clone)]
pub struct SyncHandler<W, R> {
    write_store: W,
    read_store: R,
}

impl<W: CustomerStore, R: ReadStore> SyncHandler<W, R> {
    pub fn new(write_store: W, read_store: R) -> Self {
        Self {
            write_store,
            read_store,
        }
    }

    /// Handles one decoded message body.
    ///
    /// `Err` means the message must stay in the queue for redelivery.
    #[tracing::instrument(skip(self))]
    pub async fn on_message(&self, payload: &str) -> Result<SyncOutcome, TransientFailure> {
        let result = self.project(payload).await;
        let outcome = match &result {
            Ok(outcome) => outcome.label(),
            Err(_) => "transient",
        };
        metrics::counter!("sync_messages_total", "outcome" => outcome).increment(1);
        result
    }

    async fn project(&self, payload: &str) -> Result<SyncOutcome, TransientFailure> {
        let customer_id: CustomerId = match payload.parse() {
            Ok(id) => id,
            Err(err) => {
                tracing::error!(error = %err, "discarding message without a customer id");
                return Ok(SyncOutcome::Discarded(DiscardReason::MalformedMessage {
                    payload: payload.to_string(),
                }));
            }
        };

        let record = match self.write_store.find_by_id(customer_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(%customer_id, "customer not found in write store, skipping");
                return Ok(SyncOutcome::Discarded(DiscardReason::StaleReference {
                    customer_id,
                }));
            }
            Err(err) if err.is_transient() => {
                tracing::warn!(%customer_id, error = %err, "write store unavailable");
                return Err(TransientFailure::write_store(&err));
            }
            Err(err) => {
                tracing::error!(%customer_id, error = %err, "write store rejected lookup");
                return Ok(SyncOutcome::Discarded(DiscardReason::Rejected {
                    stage: Stage::WriteStore,
                    message: err.to_string(),
                }));
            }
        };

        let projection = match CustomerProjection::from_record(&record) {
            Ok(projection) => projection,
            Err(err) => {
                tracing::error!(%customer_id, error = %err, "customer cannot be projected");
                return Ok(SyncOutcome::Discarded(DiscardReason::IncompleteRecord {
                    customer_id,
                }));
            }
        };
        let partition_key = projection.partition_key().to_string();

        match self.read_store.upsert(projection).await {
            Ok(charge) => {
                tracing::info!(
                    %customer_id,
                    partition_key = %partition_key,
                    charge = charge.units(),
                    "customer projected"
                );
                Ok(SyncOutcome::Projected {
                    customer_id,
                    partition_key,
                    charge,
                })
            }
            Err(err) if err.is_transient() => {
                tracing::warn!(%customer_id, error = %err, "read store unavailable");
                Err(TransientFailure::read_store(&err))
            }
            Err(err) => {
                tracing::error!(%customer_id, error = %err, "read store rejected projection");
                Ok(SyncOutcome::Discarded(DiscardReason::Rejected {
                    stage: Stage::ReadStore,
                    message: err.to_string(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use read_model::InMemoryDocumentStore;
    use write_store::{Country, InMemoryCustomerStore, NewCustomer};

    use super::*;

    fn handler() -> (
        SyncHandler<InMemoryCustomerStore, InMemoryDocumentStore>,
        InMemoryCustomerStore,
        InMemoryDocumentStore,
    ) {
        let write_store = InMemoryCustomerStore::new();
        let read_store = InMemoryDocumentStore::new();
        let handler = SyncHandler::new(write_store.clone(), read_store.clone());
        (handler, write_store, read_store)
    }

    #[tokio::test]
    async fn projects_existing_customer() {
        let (handler, write_store, read_store) = handler();
        let id = write_store
            .insert(&NewCustomer::new("Acme SAC 42", "12345678-3", "Lima", Country::Peru))
            .await
            .unwrap();

        let outcome = handler.on_message(&id.to_string()).await.unwrap();
        match outcome {
            SyncOutcome::Projected {
                customer_id,
                partition_key,
                charge,
            } => {
                assert_eq!(customer_id, id);
                assert_eq!(partition_key, "Peru");
                assert!(charge.units() > 0.0);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let doc = read_store.get(&id.to_string(), "Peru").await.unwrap().unwrap();
        assert_eq!(doc.nombre, "Acme SAC 42");
        assert_eq!(doc.ruc.as_deref(), Some("12345678-3"));
        assert_eq!(doc.ciudad.as_deref(), Some("Lima"));
    }

    #[tokio::test]
    async fn payload_is_trimmed() {
        let (handler, write_store, _) = handler();
        write_store
            .insert(&NewCustomer::new("Acme", "1-1", "Lima", Country::Peru))
            .await
            .unwrap();

        let outcome = handler.on_message(" 1\n").await.unwrap();
        assert!(outcome.is_projected());
    }

    #[tokio::test]
    async fn malformed_payload_is_discarded() {
        let (handler, _, read_store) = handler();

        let outcome = handler.on_message("abc").await.unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Discarded(DiscardReason::MalformedMessage {
                payload: "abc".to_string()
            })
        );
        assert_eq!(outcome.label(), "malformed");
        assert_eq!(read_store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_row_is_stale() {
        let (handler, _, read_store) = handler();

        let outcome = handler.on_message("99").await.unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Discarded(DiscardReason::StaleReference {
                customer_id: CustomerId::new(99)
            })
        );
        assert_eq!(read_store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn row_without_country_is_never_projected() {
        let (handler, write_store, read_store) = handler();
        let blank = write_store
            .insert_raw("Sin Pais", Some("1-1"), Some("Lima"), Some("   "))
            .await;
        let null = write_store
            .insert_raw("Sin Pais", Some("1-1"), Some("Lima"), None)
            .await;

        for id in [blank, null] {
            let outcome = handler.on_message(&id.to_string()).await.unwrap();
            assert_eq!(
                outcome,
                SyncOutcome::Discarded(DiscardReason::IncompleteRecord { customer_id: id })
            );
        }
        assert_eq!(read_store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn write_store_outage_is_transient() {
        let (handler, write_store, _) = handler();
        write_store.set_unavailable(true);

        let failure = handler.on_message("1").await.unwrap_err();
        assert_eq!(failure.stage, Stage::WriteStore);
    }

    #[tokio::test]
    async fn read_store_throttling_is_transient() {
        let (handler, write_store, read_store) = handler();
        let id = write_store
            .insert(&NewCustomer::new("Acme", "1-1", "Lima", Country::Peru))
            .await
            .unwrap();
        read_store.set_throttled(Some(Duration::from_millis(100)));

        let failure = handler.on_message(&id.to_string()).await.unwrap_err();
        assert_eq!(failure.stage, Stage::ReadStore);
        assert_eq!(failure.retry_after, Some(Duration::from_millis(100)));

        read_store.set_throttled(None);
        assert!(handler.on_message(&id.to_string()).await.unwrap().is_projected());
    }

    #[tokio::test]
    async fn write_store_rejection_is_consumed() {
        let (handler, write_store, read_store) = handler();
        let id = write_store
            .insert(&NewCustomer::new("Acme", "1-1", "Lima", Country::Peru))
            .await
            .unwrap();
        write_store.reject_next_reads(1);

        let outcome = handler.on_message(&id.to_string()).await.unwrap();
        assert!(matches!(
            outcome,
            SyncOutcome::Discarded(DiscardReason::Rejected {
                stage: Stage::WriteStore,
                ..
            })
        ));
        assert_eq!(outcome.label(), "rejected");
        assert_eq!(read_store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn read_store_rejection_is_consumed() {
        let write_store = InMemoryCustomerStore::new();
        let read_store = InMemoryDocumentStore::new().with_max_document_bytes(16);
        let handler = SyncHandler::new(write_store.clone(), read_store.clone());
        let id = write_store
            .insert(&NewCustomer::new("Acme SAC 42", "12345678-3", "Lima", Country::Peru))
            .await
            .unwrap();

        let outcome = handler.on_message(&id.to_string()).await.unwrap();
        match outcome {
            SyncOutcome::Discarded(DiscardReason::Rejected { stage, message }) => {
                assert_eq!(stage, Stage::ReadStore);
                assert!(message.contains("limit"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(read_store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_delivery_leaves_same_state() {
        let (handler, write_store, read_store) = handler();
        let id = write_store
            .insert(&NewCustomer::new("Acme SAC 42", "12345678-3", "Lima", Country::Peru))
            .await
            .unwrap();

        handler.on_message(&id.to_string()).await.unwrap();
        let once = read_store.snapshot().await;
        handler.on_message(&id.to_string()).await.unwrap();

        assert_eq!(read_store.snapshot().await, once);
    }

    #[tokio::test]
    async fn projection_follows_current_row() {
        let (handler, write_store, read_store) = handler();
        let id = write_store
            .insert(&NewCustomer::new("Acme", "1-1", "Lima", Country::Peru))
            .await
            .unwrap();
        handler.on_message(&id.to_string()).await.unwrap();

        write_store.set_country(id, Some("Chile")).await;
        handler.on_message(&id.to_string()).await.unwrap();

        assert_eq!(read_store.count().await.unwrap(), 1);
        assert!(read_store.get(&id.to_string(), "Chile").await.unwrap().is_some());
    }
}
