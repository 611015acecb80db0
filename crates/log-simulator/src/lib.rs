//! Synthetic log traffic generator.
//!
//! A [`LogSimulator`] runs a number of emitter tasks that each produce one
//! [`LogRecord`] per cadence tick and hand it to a [`TelemetrySink`] without
//! waiting for the write. The emitted-record count is owned by a single
//! accumulator task that the emitters report to over a channel.

pub mod error;
pub mod record;
pub mod simulator;
pub mod sink;

pub use error::{Result, SinkError};
pub use record::{LogLevel, LogRecord};
pub use simulator::{LogSimulator, SimulationReport, SimulatorConfig};
pub use sink::{InMemorySink, TelemetrySink, TracingSink};
