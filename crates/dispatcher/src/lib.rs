//! # Dispatcher
//!
//! Result dispatch module.
//!
//! Responsibilities:
//! - Consume `HealthcheckResult` from the inbox
//! - Record every result in the store
//! - Fan-out to every exporter, in registration order

pub mod dispatcher;
pub mod error;
pub mod exporters;
pub mod handle;
pub mod metrics;

pub use contracts::{Exporter, HealthcheckResult, ResultStore};
pub use dispatcher::{
    create_dispatcher, create_exporter, Dispatcher, DispatcherBuilder, DispatcherConfig,
    DispatcherState,
};
pub use error::DispatcherError;
pub use exporters::{FileExporter, HttpExporter, LogExporter};
pub use handle::ExporterHandle;
pub use metrics::{ExporterMetrics, MetricsSnapshot};
