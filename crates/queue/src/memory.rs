use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    AbandonOutcome, Delivery, MessageId, QueueConfig, QueueError, Result, codec,
    queue::MessageQueue,
};

#[derive(Debug, Clone)]
struct Entry {
    wire_body: String,
    dequeue_count: u32,
    visible_at: Instant,
    receipt: Option<Uuid>,
    enqueued_at: DateTime<Utc>,
}

/// A message that exhausted its delivery attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub message_id: MessageId,
    pub wire_body: String,
    pub dequeue_count: u32,
    pub enqueued_at: DateTime<Utc>,
}

#[derive(Default)]
struct QueueState {
    messages: BTreeMap<MessageId, Entry>,
    poison: Vec<DeadLetter>,
    last_id: i64,
}

impl QueueState {
    fn dead_letter(&mut self, message_id: MessageId) {
        if let Some(entry) = self.messages.remove(&message_id) {
            metrics::counter!("queue_dead_lettered_total").increment(1);
            tracing::warn!(
                %message_id,
                dequeue_count = entry.dequeue_count,
                "message moved to poison store"
            );
            self.poison.push(DeadLetter {
                message_id,
                wire_body: entry.wire_body,
                dequeue_count: entry.dequeue_count,
                enqueued_at: entry.enqueued_at,
            });
        }
    }
}

/// In-memory queue implementation for testing and single-process runs.
///
/// Visibility uses `tokio::time::Instant`, so tests can drive redelivery
/// with a paused clock.
#[derive(Clone, Default)]
pub struct InMemoryQueue {
    config: QueueConfig,
    state: Arc<Mutex<QueueState>>,
    fail_on_send: Arc<AtomicBool>,
}

impl InMemoryQueue {
    /// Creates an empty queue with the default delivery policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty queue with a custom delivery policy.
    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Configures the queue to reject sends.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.fail_on_send.store(fail, Ordering::SeqCst);
    }

    /// Enqueues a body exactly as given, without wire encoding.
    pub async fn send_raw(&self, wire_body: &str) -> MessageId {
        self.enqueue(wire_body.to_string()).await
    }

    /// Returns the messages moved to the poison store.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.state.lock().await.poison.clone()
    }

    /// Returns the decoded bodies of all messages still in the queue, oldest first.
    pub async fn pending_bodies(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .messages
            .values()
            .filter_map(|e| codec::decode(&e.wire_body).ok())
            .collect()
    }

    async fn enqueue(&self, wire_body: String) -> MessageId {
        let mut state = self.state.lock().await;
        state.last_id += 1;
        let message_id = MessageId::new(state.last_id);
        state.messages.insert(
            message_id,
            Entry {
                wire_body,
                dequeue_count: 0,
                visible_at: Instant::now(),
                receipt: None,
                enqueued_at: Utc::now(),
            },
        );
        message_id
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn send(&self, body: &str) -> Result<MessageId> {
        if self.fail_on_send.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable("send rejected".to_string()));
        }
        let message_id = self.enqueue(codec::encode(body)).await;
        metrics::counter!("queue_messages_sent_total").increment(1);
        Ok(message_id)
    }

    async fn receive(&self) -> Result<Option<Delivery>> {
        let now = Instant::now();
        let mut state = self.state.lock().await;

        // Leases that timed out on their last allowed attempt never come back.
        let exhausted: Vec<MessageId> = state
            .messages
            .iter()
            .filter(|(_, e)| {
                e.visible_at <= now && e.dequeue_count >= self.config.max_delivery_attempts
            })
            .map(|(id, _)| *id)
            .collect();
        for message_id in exhausted {
            state.dead_letter(message_id);
        }

        let Some((&message_id, entry)) = state
            .messages
            .iter_mut()
            .find(|(_, e)| e.visible_at <= now)
        else {
            return Ok(None);
        };

        let receipt = Uuid::new_v4();
        entry.dequeue_count += 1;
        entry.receipt = Some(receipt);
        entry.visible_at = now + self.config.visibility_timeout;

        Ok(Some(Delivery {
            message_id,
            receipt,
            wire_body: entry.wire_body.clone(),
            dequeue_count: entry.dequeue_count,
        }))
    }

    async fn complete(&self, delivery: &Delivery) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.messages.get(&delivery.message_id) {
            Some(entry) if entry.receipt == Some(delivery.receipt) => {
                state.messages.remove(&delivery.message_id);
                Ok(())
            }
            _ => Err(QueueError::LeaseLost(delivery.message_id)),
        }
    }

    async fn abandon(&self, delivery: &Delivery) -> Result<AbandonOutcome> {
        let mut state = self.state.lock().await;
        let Some(entry) = state
            .messages
            .get_mut(&delivery.message_id)
            .filter(|e| e.receipt == Some(delivery.receipt))
        else {
            return Err(QueueError::LeaseLost(delivery.message_id));
        };

        if entry.dequeue_count >= self.config.max_delivery_attempts {
            state.dead_letter(delivery.message_id);
            return Ok(AbandonOutcome::DeadLettered);
        }

        let after = self.config.backoff_for(entry.dequeue_count);
        entry.receipt = None;
        entry.visible_at = Instant::now() + after;
        Ok(AbandonOutcome::Redelivery { after })
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.state.lock().await.messages.len())
    }

    async fn dead_letter_count(&self) -> Result<usize> {
        Ok(self.state.lock().await.poison.len())
    }
}
