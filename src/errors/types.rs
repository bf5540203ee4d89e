use thiserror::Error;

#[derive(Debug, Error)]
pub enum VulnBridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed scan result: {0}")]
    MalformedResult(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Remote exploitation service unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Safety policy rejection: {0}")]
    SafetyPolicy(String),

    #[error("Scan engine error: {0}")]
    ScanEngine(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
