use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    AbandonOutcome, Delivery, MessageId, QueueConfig, QueueError, Result, codec,
    queue::MessageQueue,
};

/// PostgreSQL-backed queue.
///
/// Messages live in `sync_messages`; consumers claim them with
/// `FOR UPDATE SKIP LOCKED`, so several workers can share one table.
/// Requires the tables from `migrations/002_create_sync_queue_tables.sql`.
#[derive(Clone)]
pub struct PostgresQueue {
    pool: PgPool,
    config: QueueConfig,
}

impl PostgresQueue {
    /// Creates a queue with the default delivery policy.
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, QueueConfig::default())
    }

    /// Creates a queue with a custom delivery policy.
    pub fn with_config(pool: PgPool, config: QueueConfig) -> Self {
        Self { pool, config }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn max_attempts(&self) -> i32 {
        i32::try_from(self.config.max_delivery_attempts).unwrap_or(i32::MAX)
    }

    /// Moves expired leases that already used their last attempt to the poison table.
    async fn sweep_exhausted(&self) -> Result<u64> {
        let moved = sqlx::query(
            r#"
            WITH exhausted AS (
                DELETE FROM sync_messages
                WHERE visible_at <= NOW() AND dequeue_count >= $1
                RETURNING id, body, dequeue_count, enqueued_at
            )
            INSERT INTO sync_messages_poison (id, body, dequeue_count, enqueued_at)
            SELECT id, body, dequeue_count, enqueued_at FROM exhausted
            "#,
        )
        .bind(self.max_attempts())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if moved > 0 {
            metrics::counter!("queue_dead_lettered_total").increment(moved);
            tracing::warn!(moved, "expired messages moved to poison store");
        }
        Ok(moved)
    }
}

#[async_trait]
impl MessageQueue for PostgresQueue {
    async fn send(&self, body: &str) -> Result<MessageId> {
        let id: i64 = sqlx::query_scalar("INSERT INTO sync_messages (body) VALUES ($1) RETURNING id")
            .bind(codec::encode(body))
            .fetch_one(&self.pool)
            .await?;

        metrics::counter!("queue_messages_sent_total").increment(1);
        Ok(MessageId::new(id))
    }

    async fn receive(&self) -> Result<Option<Delivery>> {
        self.sweep_exhausted().await?;

        let receipt = Uuid::new_v4();
        let row = sqlx::query(
            r#"
            UPDATE sync_messages
            SET dequeue_count = dequeue_count + 1,
                receipt = $1,
                visible_at = NOW() + make_interval(secs => $2)
            WHERE id = (
                SELECT id FROM sync_messages
                WHERE visible_at <= NOW() AND dequeue_count < $3
                ORDER BY id
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id, body, dequeue_count
            "#,
        )
        .bind(receipt)
        .bind(self.config.visibility_timeout.as_secs_f64())
        .bind(self.max_attempts())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let dequeue_count: i32 = row.try_get("dequeue_count")?;
        Ok(Some(Delivery {
            message_id: MessageId::new(row.try_get("id")?),
            receipt,
            wire_body: row.try_get("body")?,
            dequeue_count: u32::try_from(dequeue_count).unwrap_or(0),
        }))
    }

    async fn complete(&self, delivery: &Delivery) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM sync_messages WHERE id = $1 AND receipt = $2")
            .bind(delivery.message_id.as_i64())
            .bind(delivery.receipt)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(QueueError::LeaseLost(delivery.message_id));
        }
        Ok(())
    }

    async fn abandon(&self, delivery: &Delivery) -> Result<AbandonOutcome> {
        if delivery.dequeue_count >= self.config.max_delivery_attempts {
            let moved = sqlx::query(
                r#"
                WITH exhausted AS (
                    DELETE FROM sync_messages
                    WHERE id = $1 AND receipt = $2
                    RETURNING id, body, dequeue_count, enqueued_at
                )
                INSERT INTO sync_messages_poison (id, body, dequeue_count, enqueued_at)
                SELECT id, body, dequeue_count, enqueued_at FROM exhausted
                "#,
            )
            .bind(delivery.message_id.as_i64())
            .bind(delivery.receipt)
            .execute(&self.pool)
            .await?
            .rows_affected();

            if moved == 0 {
                return Err(QueueError::LeaseLost(delivery.message_id));
            }
            metrics::counter!("queue_dead_lettered_total").increment(1);
            tracing::warn!(
                message_id = %delivery.message_id,
                dequeue_count = delivery.dequeue_count,
                "message moved to poison store"
            );
            return Ok(AbandonOutcome::DeadLettered);
        }

        let after = self.config.backoff_for(delivery.dequeue_count);
        let updated = sqlx::query(
            r#"
            UPDATE sync_messages
            SET receipt = NULL,
                visible_at = NOW() + make_interval(secs => $3)
            WHERE id = $1 AND receipt = $2
            "#,
        )
        .bind(delivery.message_id.as_i64())
        .bind(delivery.receipt)
        .bind(after.as_secs_f64())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(QueueError::LeaseLost(delivery.message_id));
        }
        Ok(AbandonOutcome::Redelivery { after })
    }

    async fn len(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn dead_letter_count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_messages_poison")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
