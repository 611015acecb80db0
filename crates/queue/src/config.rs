use std::time::Duration;

/// Delivery policy of a queue.
///
/// Retry counts and backoff belong to the queue, not to its consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Deliveries after which an abandoned message is dead-lettered.
    pub max_delivery_attempts: u32,
    /// How long a received message stays hidden before it is redelivered.
    pub visibility_timeout: Duration,
    /// Delay before the first redelivery of an abandoned message.
    pub base_backoff: Duration,
    /// Upper bound for the redelivery delay.
    pub max_backoff: Duration,
}

impl QueueConfig {
    /// Delay before redelivering a message abandoned after `dequeue_count` deliveries.
    pub fn backoff_for(&self, dequeue_count: u32) -> Duration {
        let exponent = dequeue_count.saturating_sub(1).min(31);
        self.base_backoff
            .checked_mul(1u32 << exponent)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_delivery_attempts: 5,
            visibility_timeout: Duration::from_secs(30),
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = QueueConfig::default();
        assert_eq!(config.max_delivery_attempts, 5);
        assert_eq!(config.visibility_timeout, Duration::from_secs(30));
    }

    #[test]
    fn backoff_doubles_per_delivery() {
        let config = QueueConfig::default();
        assert_eq!(config.backoff_for(1), Duration::from_secs(1));
        assert_eq!(config.backoff_for(2), Duration::from_secs(2));
        assert_eq!(config.backoff_for(4), Duration::from_secs(8));
    }

    #[test]
    fn backoff_is_capped() {
        let config = QueueConfig::default();
        assert_eq!(config.backoff_for(10), Duration::from_secs(60));
        assert_eq!(config.backoff_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn zero_deliveries_uses_base_backoff() {
        let config = QueueConfig::default();
        assert_eq!(config.backoff_for(0), Duration::from_secs(1));
    }
}
