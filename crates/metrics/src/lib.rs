//! Metrics for herald.
//!
//! Call sites use the `metrics` facade macros re-exported here together with
//! the names in [`definitions`]; without an installed recorder they are
//! no-ops. The `prometheus` feature installs an in-process Prometheus
//! recorder whose snapshot can be rendered on demand.
//!
//! ```rust,ignore
//! use herald_metrics::{counter, dispatch};
//!
//! counter!(dispatch::COMMANDS_EXECUTED_TOTAL, "command" => "ping").increment(1);
//! ```

mod definitions;
mod error;
mod recorder;

pub use {
    definitions::*,
    error::{Error, Result},
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

pub use metrics::{counter, gauge, histogram};
