pub mod orchestrator;
pub mod state;

pub use orchestrator::RunOrchestrator;
pub use state::{RunPhase, RunState, RunStatus, RunSummary};
