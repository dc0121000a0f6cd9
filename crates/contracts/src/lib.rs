//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Result timestamps are wall-clock seconds since the Unix epoch
//! - Check durations are measured seconds (f64)

mod config;
mod error;
mod exporter;
mod result;
mod store;

pub use config::*;
pub use error::*;
pub use exporter::Exporter;
pub use result::{Healthcheck, HealthcheckResult, SUCCESS_MESSAGE};
pub use store::ResultStore;
