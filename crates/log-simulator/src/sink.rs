use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{LogRecord, Result, SinkError};

/// Destination for emitted log records.
#[async_trait]
pub trait TelemetrySink: Send + Sync + 'static {
    /// Stores one record, partitioned by its tenant.
    async fn write(&self, record: LogRecord) -> Result<()>;
}

/// In-memory sink for testing.
#[derive(Clone, Default)]
pub struct InMemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
    fail_on_write: Arc<AtomicBool>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the sink to reject every write.
    pub fn set_fail_on_write(&self, fail: bool) {
        self.fail_on_write.store(fail, Ordering::SeqCst);
    }

    pub async fn records(&self) -> Vec<LogRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

#[async_trait]
impl TelemetrySink for InMemorySink {
    async fn write(&self, record: LogRecord) -> Result<()> {
        if self.fail_on_write.load(Ordering::SeqCst) {
            return Err(SinkError::Rejected("sink switched off".to_string()));
        }
        self.records.lock().await.push(record);
        Ok(())
    }
}

/// Writes each record as one structured log line under the `telemetry` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl TelemetrySink for TracingSink {
    async fn write(&self, record: LogRecord) -> Result<()> {
        let payload = record
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        tracing::info!(
            target: "telemetry",
            id = %record.id,
            tenant_id = %record.tenant_id,
            timestamp = %record.timestamp,
            correlation_id = %record.correlation_id,
            service = %record.service,
            level = %record.level,
            payload = payload.as_deref(),
            "{}",
            record.message
        );
        Ok(())
    }
}
