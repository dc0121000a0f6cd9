//! ResultStore trait - in-process retention of results

use crate::HealthcheckResult;

/// In-memory result retention
///
/// Shared between the dispatcher (writer) and query paths (readers), so
/// implementations take `&self` and handle their own synchronization.
pub trait ResultStore: Send + Sync {
    /// Start background maintenance, if any
    fn start(&self);

    /// Record one result
    fn add(&self, result: &HealthcheckResult);
}
