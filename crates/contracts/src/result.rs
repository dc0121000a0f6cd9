//! HealthcheckResult - check execution output
//!
//! One immutable record per completed healthcheck.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Display;

/// Message carried by every successful result
pub const SUCCESS_MESSAGE: &str = "success";

/// Source of a result's identity
///
/// Implemented by whatever executes checks; only the identity half of a
/// check is needed to build a [`HealthcheckResult`].
pub trait Healthcheck {
    /// Healthcheck name (result identity)
    fn name(&self) -> &str;

    /// Opaque description of the check, copied into the result
    fn summary(&self) -> Option<Value> {
        None
    }

    /// Labels attached to every result of this check
    fn labels(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// Outcome of a single healthcheck execution
///
/// Equality is structural: every field must match and `labels` must hold the
/// same set of key/value pairs, regardless of iteration order. Two distinct
/// executions with identical fields are indistinguishable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthcheckResult {
    /// Healthcheck name
    pub name: String,

    /// Opaque check description
    #[serde(default)]
    pub summary: Option<Value>,

    /// Check labels
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,

    /// Whether the check succeeded
    pub success: bool,

    /// Construction time (seconds since Unix epoch)
    #[serde(rename = "healthcheck-timestamp")]
    pub timestamp: i64,

    /// `"success"`, or the failure cause
    pub message: String,

    /// Measured check duration (seconds)
    pub duration: f64,
}

impl HealthcheckResult {
    /// Build the result of a finished check, stamped with the current time
    ///
    /// `error` decides the outcome: `None` is a success, `Some(e)` a failure
    /// whose message is `e.to_string()`.
    pub fn new<C>(check: &C, duration: f64, error: Option<&dyn Display>) -> Self
    where
        C: Healthcheck + ?Sized,
    {
        Self::with_timestamp(check, chrono::Utc::now().timestamp(), duration, error)
    }

    /// Same as [`HealthcheckResult::new`] with an explicit timestamp
    pub fn with_timestamp<C>(
        check: &C,
        timestamp: i64,
        duration: f64,
        error: Option<&dyn Display>,
    ) -> Self
    where
        C: Healthcheck + ?Sized,
    {
        let (success, message) = match error {
            Some(e) => (false, e.to_string()),
            None => (true, SUCCESS_MESSAGE.to_string()),
        };

        Self {
            name: check.name().to_string(),
            summary: check.summary(),
            labels: check.labels(),
            success,
            timestamp,
            message,
            duration,
        }
    }

    /// Value-based comparison, see the type-level docs
    pub fn equals(&self, other: &Self) -> bool {
        self == other
    }
}
