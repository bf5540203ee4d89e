use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MAX_EVIDENCE_LENGTH: usize = 4_000;

/// Lifecycle of one validation attempt against the remote exploitation
/// service. `SkippedUnsafe` is terminal straight from `Queued`; nothing is
/// ever submitted for a candidate the safety policy rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationState {
    Queued,
    Submitted,
    Polling,
    Confirmed,
    Inconclusive,
    Failed,
    SkippedUnsafe,
}

impl ValidationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Confirmed | Self::Inconclusive | Self::Failed | Self::SkippedUnsafe
        )
    }
}

/// Final judgement of a validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// The safe check demonstrated exploitability.
    Confirmed,
    /// The check ran but could not decide either way (includes poll timeout).
    Inconclusive,
    /// The remote job errored or the service was unreachable.
    Failed,
    /// Safety policy rejected the candidate before submission.
    SkippedUnsafe,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Inconclusive => "inconclusive",
            Self::Failed => "failed",
            Self::SkippedUnsafe => "skipped-unsafe",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one validation attempt of one candidate. Historical outcomes
/// are retained by the run that produced them, never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub candidate_id: String,
    /// Remote job id; None when the job was never submitted.
    pub job_id: Option<String>,
    pub state: ValidationState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Bounded excerpt of the remote job's log output.
    pub evidence: String,
    pub verdict: Verdict,
}

impl Outcome {
    /// Bound evidence to a report-friendly excerpt, keeping head and tail.
    /// Split points snap to char boundaries; remote log output is arbitrary
    /// UTF-8 and must never panic the slice.
    pub fn truncate_evidence(evidence: &str) -> String {
        if evidence.len() <= MAX_EVIDENCE_LENGTH {
            return evidence.to_string();
        }
        let half = MAX_EVIDENCE_LENGTH / 2;
        let start = &evidence[..floor_char_boundary(evidence, half)];
        let end = &evidence[floor_char_boundary(evidence, evidence.len() - half)..];
        format!(
            "{}\n\n... [truncated {} bytes] ...\n\n{}",
            start,
            evidence.len() - start.len() - end.len(),
            end
        )
    }
}

/// Largest index `<= at` that lands on a char boundary of `s`.
pub(crate) fn floor_char_boundary(s: &str, at: usize) -> usize {
    if at >= s.len() {
        return s.len();
    }
    let mut index = at;
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
