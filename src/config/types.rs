use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::VulnBridgeError;
use crate::models::EngineTag;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub engines: EnginesConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub severity: SeverityConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EnginesConfig {
    #[serde(default)]
    pub web_scanner: EngineConfig,
    #[serde(default)]
    pub network_scanner: EngineConfig,
    #[serde(default)]
    pub template_scanner: EngineConfig,
}

impl EnginesConfig {
    pub fn for_tag(&self, tag: EngineTag) -> &EngineConfig {
        match tag {
            EngineTag::WebScanner => &self.web_scanner,
            EngineTag::NetworkScanner => &self.network_scanner,
            EngineTag::TemplateScanner => &self.template_scanner,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Hosts / host:port entries handed to the engine adapter.
    #[serde(default)]
    pub targets: Vec<String>,
    /// Adapter-specific endpoint; the adapter owns auth/session handling.
    pub endpoint: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            targets: Vec::new(),
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// Plain seconds ("3600") or whole days ("7d").
    pub cadence: Option<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { cadence: None }
    }
}

impl ScheduleConfig {
    pub fn cadence_duration(&self) -> Result<Option<Duration>, VulnBridgeError> {
        match self.cadence.as_deref() {
            None => Ok(None),
            Some(expr) => parse_cadence(expr).map(Some),
        }
    }
}

/// Parse a cadence expression: bare seconds or `<n>d` day intervals.
pub fn parse_cadence(expr: &str) -> Result<Duration, VulnBridgeError> {
    let expr = expr.trim();
    let (number, unit_secs) = match expr.strip_suffix('d') {
        Some(days) => (days, 86_400u64),
        None => (expr, 1u64),
    };
    let n: u64 = number
        .parse()
        .map_err(|_| VulnBridgeError::Config(format!("Invalid cadence expression: {expr}")))?;
    if n == 0 {
        return Err(VulnBridgeError::Config("Cadence must be non-zero".into()));
    }
    let secs = n
        .checked_mul(unit_secs)
        .ok_or_else(|| VulnBridgeError::Config(format!("Cadence overflows: {expr}")))?;
    Ok(Duration::from_secs(secs))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidationConfig {
    /// Simultaneous remote exploitation jobs. Bounding this is a safety
    /// requirement: parallel jobs against one target risk service disruption.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SafetyConfig {
    /// Hosts validation must never touch, even with a matched exploit.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
    /// Module ids that are always rejected regardless of safe-mode support.
    #[serde(default)]
    pub destructive_modules: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatcherConfig {
    #[serde(default = "default_cve_confidence")]
    pub cve_confidence: f64,
    #[serde(default = "default_fingerprint_confidence")]
    pub fingerprint_confidence: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            cve_confidence: default_cve_confidence(),
            fingerprint_confidence: default_fingerprint_confidence(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeverityConfig {
    /// Minimum normalized severity reported for a confirmed-exploitable
    /// finding. Confirmed exploitability must never read as low severity.
    #[serde(default = "default_confirmed_floor")]
    pub confirmed_floor: f64,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            confirmed_floor: default_confirmed_floor(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_endpoint")]
    pub endpoint: String,
    /// API token for the exploitation service; auth handling beyond sending
    /// it is the service's concern.
    pub token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_remote_endpoint(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_concurrency() -> usize {
    3
}
fn default_poll_interval() -> u64 {
    5
}
fn default_timeout() -> u64 {
    300
}
fn default_cve_confidence() -> f64 {
    0.9
}
fn default_fingerprint_confidence() -> f64 {
    0.6
}
fn default_confirmed_floor() -> f64 {
    7.0
}
fn default_catalog_path() -> String {
    "./catalog.yaml".to_string()
}
fn default_remote_endpoint() -> String {
    "http://127.0.0.1:55553/api".to_string()
}
fn default_db_path() -> String {
    "./data/vulnbridge.db".to_string()
}
fn default_output_dir() -> String {
    "./reports".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cadence_seconds() {
        assert_eq!(parse_cadence("3600").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_cadence_days() {
        assert_eq!(parse_cadence("7d").unwrap(), Duration::from_secs(7 * 86_400));
    }

    #[test]
    fn test_parse_cadence_rejects_zero() {
        assert!(parse_cadence("0").is_err());
        assert!(parse_cadence("0d").is_err());
    }

    #[test]
    fn test_parse_cadence_rejects_day_overflow() {
        let err = parse_cadence("999999999999999999d").unwrap_err();
        assert!(matches!(err, VulnBridgeError::Config(_)));
    }

    #[test]
    fn test_parse_cadence_rejects_garbage() {
        assert!(parse_cadence("weekly").is_err());
        assert!(parse_cadence("").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.validation.concurrency, 3);
        assert_eq!(config.validation.timeout_secs, 300);
        assert_eq!(config.matcher.cve_confidence, 0.9);
        assert_eq!(config.matcher.fingerprint_confidence, 0.6);
        assert_eq!(config.severity.confirmed_floor, 7.0);
        assert!(config.engines.web_scanner.enabled);
    }

    #[test]
    fn test_minimal_yaml_deserializes() {
        let yaml = r#"
engines:
  network_scanner:
    targets: ["10.0.0.5"]
schedule:
  cadence: "1d"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.engines.network_scanner.targets, vec!["10.0.0.5"]);
        assert_eq!(
            config.schedule.cadence_duration().unwrap().unwrap(),
            Duration::from_secs(86_400)
        );
    }
}
