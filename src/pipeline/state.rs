use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Report;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

/// The phases of one pipeline run, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RunPhase {
    Ingest,
    Match,
    Validate,
    Aggregate,
    Publish,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ingest => write!(f, "ingest"),
            Self::Match => write!(f, "match"),
            Self::Validate => write!(f, "validate"),
            Self::Aggregate => write!(f, "aggregate"),
            Self::Publish => write!(f, "publish"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub status: RunStatus,
    pub current_phase: Option<RunPhase>,
    pub start_time: DateTime<Utc>,
    pub error: Option<String>,
}

impl RunState {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            status: RunStatus::Queued,
            current_phase: None,
            start_time: Utc::now(),
            error: None,
        }
    }
}

/// Compact counters for a finished run, for log lines and CLI output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub total_findings: usize,
    pub candidates: usize,
    pub outcomes: usize,
    pub confirmed: usize,
    pub warnings: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn from_report(report: &Report) -> Self {
        Self {
            run_id: report.run_id.clone(),
            total_findings: report.summary.total,
            candidates: report.entries.iter().map(|e| e.candidates.len()).sum(),
            outcomes: report.entries.iter().map(|e| e.outcomes.len()).sum(),
            confirmed: report.summary.confirmed,
            warnings: report.warnings.len(),
            duration_ms: report
                .finished_at
                .signed_duration_since(report.started_at)
                .num_milliseconds()
                .unsigned_abs(),
        }
    }
}
