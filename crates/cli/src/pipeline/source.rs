//! Check outcomes read from the input stream.

use std::collections::HashMap;
use std::fmt::Display;

use contracts::{Healthcheck, HealthcheckResult};
use serde::Deserialize;
use serde_json::Value;

/// One finished check, as written by the external check runner
///
/// ```json
/// {"name": "disk", "labels": {"env": "prod"}, "duration": 0.01}
/// {"name": "dns", "duration": 2.0, "error": "timeout"}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    #[serde(default)]
    pub summary: Option<Value>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Elapsed seconds
    pub duration: f64,
    /// Failure cause; absent on success
    #[serde(default)]
    pub error: Option<String>,
}

impl CheckOutcome {
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// Build the result, stamped with the current time
    pub fn into_result(self) -> HealthcheckResult {
        let error = self.error.as_ref().map(|e| e as &dyn Display);
        HealthcheckResult::new(&self, self.duration, error)
    }
}

impl Healthcheck for CheckOutcome {
    fn name(&self) -> &str {
        &self.name
    }

    fn summary(&self) -> Option<Value> {
        self.summary.clone()
    }

    fn labels(&self) -> HashMap<String, String> {
        self.labels.clone()
    }
}
