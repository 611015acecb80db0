use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{Result, codec};

/// Identifier the queue assigns to an enqueued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(i64);

impl MessageId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A leased message handed to a consumer.
///
/// The receipt identifies this particular lease: once the visibility
/// timeout passes and the message is delivered again, the old receipt can
/// no longer complete or abandon it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: MessageId,
    pub receipt: Uuid,
    pub wire_body: String,
    /// How many times the message has been delivered, this delivery included.
    pub dequeue_count: u32,
}

impl Delivery {
    /// Decodes the wire body to text.
    pub fn text(&self) -> Result<String> {
        codec::decode(&self.wire_body)
    }
}

/// What happened to an abandoned message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonOutcome {
    /// The message becomes visible again after the delay.
    Redelivery { after: Duration },
    /// The message ran out of attempts and was moved to the poison store.
    DeadLettered,
}

/// Core trait for queue implementations.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueues a text body. The queue encodes it for the wire.
    async fn send(&self, body: &str) -> Result<MessageId>;

    /// Leases the oldest visible message, if any. Never blocks waiting.
    async fn receive(&self) -> Result<Option<Delivery>>;

    /// Deletes a delivered message.
    ///
    /// Fails with `LeaseLost` if the delivery's lease is no longer current.
    async fn complete(&self, delivery: &Delivery) -> Result<()>;

    /// Gives a delivered message back for redelivery or dead-lettering.
    async fn abandon(&self, delivery: &Delivery) -> Result<AbandonOutcome>;

    /// Number of messages waiting or leased.
    async fn len(&self) -> Result<usize>;

    /// Number of messages moved to the poison store.
    async fn dead_letter_count(&self) -> Result<usize>;
}
