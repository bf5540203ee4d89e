pub mod candidate;
pub mod finding;
pub mod outcome;
pub mod report;

pub use candidate::{Candidate, MatchBasis};
pub use finding::{EngineTag, Finding};
pub use outcome::{Outcome, ValidationState, Verdict};
pub use report::{Report, ReportEntry, RunWarning, SeveritySummary};
