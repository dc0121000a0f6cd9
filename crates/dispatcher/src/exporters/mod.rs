//! Exporter implementations
//!
//! Contains LogExporter, FileExporter, and HttpExporter.

mod file;
mod http;
mod log;

pub use self::file::{FileExporter, FileExporterConfig};
pub use self::http::{HttpExporter, HttpExporterConfig};
pub use self::log::LogExporter;
