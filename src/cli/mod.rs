pub mod commands;
pub mod history;
pub mod run;
pub mod schedule;

pub use commands::{Cli, Commands};
