pub mod aggregate;
pub mod cli;
pub mod config;
pub mod db;
pub mod engines;
pub mod errors;
pub mod matcher;
pub mod models;
pub mod pipeline;
pub mod reporting;
pub mod scheduler;
pub mod validation;

pub use errors::VulnBridgeError;
