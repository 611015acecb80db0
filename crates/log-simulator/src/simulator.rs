use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::{LogLevel, LogRecord, TelemetrySink};

const DEFAULT_TENANTS: [&str; 5] = [
    "CLIENTE-001",
    "CLIENTE-002",
    "CLIENTE-003",
    "CLIENTE-004",
    "CLIENTE-005",
];
const DEFAULT_SERVICES: [&str; 4] = [
    "Invoicing.API",
    "Inventory.API",
    "Auth.API",
    "Shipping.API",
];

/// Settings for a simulation run.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Number of concurrent emitter tasks.
    pub emitters: usize,
    /// Delay between two records of the same emitter.
    pub cadence: Duration,
    /// The accumulator logs progress every this many records.
    pub report_every: u64,
    pub tenants: Vec<String>,
    pub services: Vec<String>,
    /// Seeds the per-emitter random choices when set.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            emitters: 1,
            cadence: Duration::from_millis(5),
            report_every: 100,
            tenants: DEFAULT_TENANTS.iter().map(|t| t.to_string()).collect(),
            services: DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect(),
            seed: None,
        }
    }
}

/// Totals collected by the accumulator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub total: u64,
    pub per_tenant: BTreeMap<String, u64>,
}

struct Emitted {
    tenant_id: String,
}

/// Runs emitters against a sink until shut down.
pub struct LogSimulator<S> {
    sink: Arc<S>,
    config: SimulatorConfig,
}

impl<S: TelemetrySink> LogSimulator<S> {
    pub fn new(sink: S, config: SimulatorConfig) -> Self {
        Self {
            sink: Arc::new(sink),
            config,
        }
    }

    /// Emits records until `shutdown` flips to true, then returns the totals.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> SimulationReport {
        let (tx, rx) = mpsc::channel(1024);
        let accumulator = tokio::spawn(accumulate(rx, self.config.report_every.max(1)));

        let mut emitters = JoinSet::new();
        for index in 0..self.config.emitters.max(1) {
            let rng = match self.config.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
                None => StdRng::from_os_rng(),
            };
            emitters.spawn(emit(
                index,
                Arc::clone(&self.sink),
                self.config.clone(),
                rng,
                tx.clone(),
                shutdown.clone(),
            ));
        }
        drop(tx);

        tracing::info!(
            emitters = self.config.emitters.max(1),
            cadence_ms = self.config.cadence.as_millis() as u64,
            "log simulation started"
        );

        while let Some(joined) = emitters.join_next().await {
            if let Err(err) = joined {
                tracing::error!(error = %err, "emitter task failed");
            }
        }

        let report = match accumulator.await {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(error = %err, "accumulator task failed");
                SimulationReport::default()
            }
        };
        tracing::info!(total = report.total, "log simulation stopped");
        report
    }
}

async fn emit<S: TelemetrySink>(
    index: usize,
    sink: Arc<S>,
    config: SimulatorConfig,
    mut rng: StdRng,
    counter: mpsc::Sender<Emitted>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(config.cadence.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut writes = JoinSet::new();
    let mut sequence: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }

        let tenant_id = config
            .tenants
            .choose(&mut rng)
            .cloned()
            .unwrap_or_default();
        let service = config
            .services
            .choose(&mut rng)
            .cloned()
            .unwrap_or_default();
        let level = if rng.random_ratio(1, 50) {
            LogLevel::Warning
        } else {
            LogLevel::Information
        };
        sequence += 1;

        let record = LogRecord::new(
            tenant_id.clone(),
            service,
            format!("Operación {sequence} completada."),
        )
        .with_level(level)
        .with_payload(serde_json::json!({ "emitter": index, "sequence": sequence }));

        let sink = Arc::clone(&sink);
        writes.spawn(async move {
            let record_id = record.id;
            if let Err(err) = sink.write(record).await {
                metrics::counter!("log_sink_failures_total").increment(1);
                tracing::error!(%record_id, error = %err, "failed to store log record");
            }
        });
        while writes.try_join_next().is_some() {}

        if counter.send(Emitted { tenant_id }).await.is_err() {
            break;
        }
    }

    while writes.join_next().await.is_some() {}
    tracing::debug!(emitter = index, emitted = sequence, "emitter stopped");
}

/// Owns the emitted-record count. Returns once every emitter has hung up.
async fn accumulate(mut rx: mpsc::Receiver<Emitted>, report_every: u64) -> SimulationReport {
    let mut report = SimulationReport::default();
    while let Some(emitted) = rx.recv().await {
        report.total += 1;
        *report.per_tenant.entry(emitted.tenant_id).or_default() += 1;
        metrics::counter!("log_records_emitted_total").increment(1);

        if report.total % report_every == 0 {
            tracing::info!(total = report.total, "log records emitted");
        }
    }
    report
}
