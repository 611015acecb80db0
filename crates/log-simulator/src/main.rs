//! Log simulator entry point.

use std::time::Duration;

use clap::Parser;
use log_simulator::{LogSimulator, SimulatorConfig, TracingSink};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Emit synthetic multi-tenant log records at a fixed cadence.
#[derive(Debug, Parser)]
#[command(name = "log-simulator", version)]
struct Args {
    /// Number of concurrent emitters.
    #[arg(long, default_value_t = 1, env = "SIM_EMITTERS")]
    emitters: usize,

    /// Milliseconds between two records of one emitter.
    #[arg(long, default_value_t = 5, env = "SIM_CADENCE_MS")]
    cadence_ms: u64,

    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Print a progress line every this many records.
    #[arg(long, default_value_t = 100)]
    report_every: u64,

    /// Emit log lines as JSON.
    #[arg(long, env = "LOG_FORMAT_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if args.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let config = SimulatorConfig {
        emitters: args.emitters,
        cadence: Duration::from_millis(args.cadence_ms),
        report_every: args.report_every,
        ..SimulatorConfig::default()
    };
    let simulator = LogSimulator::new(TracingSink, config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let duration = args.duration_secs.map(Duration::from_secs);
    tokio::spawn(async move {
        match duration {
            Some(duration) => {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {
                        tracing::info!("simulation time elapsed");
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("received SIGINT, stopping simulation");
                    }
                }
            }
            None => {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("received SIGINT, stopping simulation");
            }
        }
        let _ = shutdown_tx.send(true);
    });

    let report = simulator.run(shutdown_rx).await;
    for (tenant, count) in &report.per_tenant {
        tracing::info!(tenant = %tenant, count, "records per tenant");
    }
    println!("\nSimulation stopped after {} records.", report.total);
}
