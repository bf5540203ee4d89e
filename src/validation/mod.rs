pub mod remote;
pub mod runner;
pub mod safety;

pub use remote::{ExploitService, HttpExploitService, RemoteJobState, RemoteJobStatus, SafeModeConfig};
pub use runner::{ValidationJob, ValidationRunner};
pub use safety::{ModuleSpec, SafetyPolicy};
