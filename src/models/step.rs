use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Immutable record of a step that has finished, appended in completion
/// order. The same id may appear more than once when a step is started
/// again after ending.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedStep {
    /// Identifier supplied to `start_step`.
    pub id: String,
    /// Wall-clock instant the step was first started, captured once at
    /// creation and never adjusted afterwards.
    #[serde(rename = "start")]
    pub started_at: DateTime<Utc>,
    /// Wall-clock instant the step ended.
    #[serde(rename = "end")]
    pub ended_at: DateTime<Utc>,
    /// Milliseconds the step spent running, excluding paused intervals.
    #[serde(rename = "duration")]
    pub duration_ms: u64,
}

impl CompletedStep {
    pub fn duration(&self) -> Duration {
        Duration::milliseconds(self.duration_ms as i64)
    }
}
