use std::path::Path;

use super::schema::CONFIG_SCHEMA;
use super::types::AppConfig;
use crate::errors::VulnBridgeError;
use tracing::warn;

pub async fn parse_config(path: &Path) -> Result<AppConfig, VulnBridgeError> {
    if !path.exists() {
        return Err(VulnBridgeError::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(VulnBridgeError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(&content)?;

    // JSON Schema validation
    validate_schema(&yaml)?;

    // Parse into typed config
    let config: AppConfig = serde_yaml::from_value(yaml)?;

    // Semantic validation
    validate_semantics(&config)?;

    Ok(config)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), VulnBridgeError> {
    // Convert YAML value to JSON for schema validation
    let json_str = serde_json::to_string(yaml)
        .map_err(|e| VulnBridgeError::Config(format!("Config conversion error: {}", e)))?;
    let json_value: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| VulnBridgeError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| VulnBridgeError::Config(format!("Schema compilation error: {}", e)))?;

    let result = compiled.validate(&json_value);
    if let Err(errors) = result {
        // Warn but don't fail — schema validation is advisory
        for e in errors {
            warn!(validation_error = %format!("{} at {}", e, e.instance_path), "Config schema warning");
        }
    }

    Ok(())
}

/// Detect semantic problems the schema cannot express.
fn validate_semantics(config: &AppConfig) -> Result<(), VulnBridgeError> {
    if config.validation.concurrency == 0 {
        return Err(VulnBridgeError::Config(
            "validation.concurrency must be at least 1".into(),
        ));
    }

    if config.validation.poll_interval_secs > config.validation.timeout_secs {
        return Err(VulnBridgeError::Config(format!(
            "validation.poll_interval_secs ({}) exceeds validation.timeout_secs ({})",
            config.validation.poll_interval_secs, config.validation.timeout_secs
        )));
    }

    for weight in [
        config.matcher.cve_confidence,
        config.matcher.fingerprint_confidence,
    ] {
        if !(0.0..=1.0).contains(&weight) {
            return Err(VulnBridgeError::Config(format!(
                "Matcher confidence {} outside 0.0-1.0",
                weight
            )));
        }
    }

    if !(0.0..=10.0).contains(&config.severity.confirmed_floor) {
        return Err(VulnBridgeError::Config(
            "severity.confirmed_floor outside 0.0-10.0".into(),
        ));
    }

    // Cadence must parse if present
    config.schedule.cadence_duration()?;

    // A target that is both scanned and safety-excluded is almost certainly a
    // config mistake: its findings can never be validated.
    for engine in [
        &config.engines.web_scanner,
        &config.engines.network_scanner,
        &config.engines.template_scanner,
    ] {
        for target in &engine.targets {
            let host = target.split(':').next().unwrap_or(target);
            if config
                .safety
                .excluded_targets
                .iter()
                .any(|excluded| excluded == host)
            {
                warn!(target = %target, "Target is scanned but safety-excluded; findings will skip validation");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{MatcherConfig, ValidationConfig};

    #[test]
    fn test_validate_semantics_rejects_zero_concurrency() {
        let config = AppConfig {
            validation: ValidationConfig {
                concurrency: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_semantics(&config).is_err());
    }

    #[test]
    fn test_validate_semantics_rejects_poll_longer_than_timeout() {
        let config = AppConfig {
            validation: ValidationConfig {
                concurrency: 2,
                poll_interval_secs: 600,
                timeout_secs: 300,
            },
            ..Default::default()
        };
        assert!(validate_semantics(&config).is_err());
    }

    #[test]
    fn test_validate_semantics_rejects_bad_confidence() {
        let config = AppConfig {
            matcher: MatcherConfig {
                cve_confidence: 1.5,
                fingerprint_confidence: 0.6,
            },
            ..Default::default()
        };
        assert!(validate_semantics(&config).is_err());
    }

    #[test]
    fn test_validate_semantics_default_ok() {
        assert!(validate_semantics(&AppConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_parse_config_missing_file() {
        let result = parse_config(Path::new("/nonexistent/vulnbridge.yaml")).await;
        assert!(matches!(result, Err(VulnBridgeError::Config(_))));
    }

    #[tokio::test]
    async fn test_parse_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        tokio::fs::write(
            &path,
            r#"
engines:
  network_scanner:
    targets: ["10.0.0.5", "10.0.0.6:8443"]
validation:
  concurrency: 2
  timeout_secs: 120
safety:
  excluded_targets: ["10.0.0.9"]
"#,
        )
        .await
        .unwrap();

        let config = parse_config(&path).await.unwrap();
        assert_eq!(config.validation.concurrency, 2);
        assert_eq!(config.engines.network_scanner.targets.len(), 2);
        assert_eq!(config.safety.excluded_targets, vec!["10.0.0.9"]);
    }
}
