use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candidate::Candidate;
use super::finding::Finding;
use super::outcome::{Outcome, Verdict};

/// One finding row in a report, with everything that happened to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub finding: Finding,
    /// 0-10 severity after per-engine normalization and the confirmed floor.
    pub normalized_severity: f64,
    pub confirmed: bool,
    pub candidates: Vec<Candidate>,
    pub outcomes: Vec<Outcome>,
}

impl ReportEntry {
    /// A finding is confirmed-exploitable iff any outcome verdict says so.
    pub fn any_confirmed(outcomes: &[Outcome]) -> bool {
        outcomes.iter().any(|o| o.verdict == Verdict::Confirmed)
    }

    pub fn severity_band(&self) -> &'static str {
        severity_band(self.normalized_severity)
    }
}

/// Band a 0-10 normalized severity the way the report groups counts.
pub fn severity_band(severity: f64) -> &'static str {
    if severity >= 9.0 {
        "critical"
    } else if severity >= 7.0 {
        "high"
    } else if severity >= 4.0 {
        "medium"
    } else if severity > 0.0 {
        "low"
    } else {
        "info"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub confirmed: usize,
    pub total: usize,
}

impl SeveritySummary {
    pub fn count(&mut self, entry: &ReportEntry) {
        match entry.severity_band() {
            "critical" => self.critical += 1,
            "high" => self.high += 1,
            "medium" => self.medium += 1,
            "low" => self.low += 1,
            _ => self.info += 1,
        }
        if entry.confirmed {
            self.confirmed += 1;
        }
        self.total += 1;
    }
}

/// A structured, non-fatal problem recorded against a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunWarning {
    pub phase: String,
    pub error_type: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl RunWarning {
    pub fn new(phase: &str, error_type: &str, message: impl Into<String>) -> Self {
        Self {
            phase: phase.to_string(),
            error_type: error_type.to_string(),
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Consolidated result of one full pipeline run. Every finding ingested in
/// the run appears in exactly one entry, matched or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub entries: Vec<ReportEntry>,
    pub summary: SeveritySummary,
    pub warnings: Vec<RunWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_bands() {
        assert_eq!(severity_band(10.0), "critical");
        assert_eq!(severity_band(9.0), "critical");
        assert_eq!(severity_band(7.5), "high");
        assert_eq!(severity_band(5.0), "medium");
        assert_eq!(severity_band(2.5), "low");
        assert_eq!(severity_band(0.0), "info");
    }

    #[test]
    fn test_any_confirmed_is_or_over_outcomes() {
        let mk = |verdict| Outcome {
            candidate_id: "c".into(),
            job_id: None,
            state: crate::models::ValidationState::Failed,
            started_at: Utc::now(),
            finished_at: None,
            evidence: String::new(),
            verdict,
        };
        assert!(!ReportEntry::any_confirmed(&[mk(Verdict::Failed), mk(Verdict::Inconclusive)]));
        assert!(ReportEntry::any_confirmed(&[mk(Verdict::Failed), mk(Verdict::Confirmed)]));
        assert!(!ReportEntry::any_confirmed(&[]));
    }
}
