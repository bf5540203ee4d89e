use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::errors::VulnBridgeError;

/// On-disk shape of one catalog entry.
#[derive(Debug, Clone, Deserialize)]
struct RawCatalogEntry {
    id: String,
    #[serde(default)]
    safe_mode: bool,
    #[serde(default)]
    destructive: bool,
    #[serde(default)]
    cves: Vec<String>,
    #[serde(default)]
    fingerprints: Vec<String>,
    /// Finding native ids pinned to this module by an operator.
    #[serde(default)]
    overrides: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawCatalog {
    version: String,
    modules: Vec<RawCatalogEntry>,
}

/// One exploit module the catalog knows how to reach a finding from.
#[derive(Debug)]
pub struct CatalogEntry {
    pub module_id: String,
    /// Whether the module has a check/verify-only variant. Modules without
    /// one are never submitted; validation yields skipped-unsafe instead.
    pub safe_mode: bool,
    pub destructive: bool,
    pub cves: Vec<String>,
    pub fingerprints: Vec<Regex>,
    pub overrides: Vec<String>,
}

/// Versioned, read-only mapping from vulnerability identifiers to exploit
/// modules. Loaded once per run; the matcher never mutates it and it may be
/// shared across concurrent runs.
#[derive(Debug)]
pub struct ExploitCatalog {
    pub version: String,
    pub entries: Vec<CatalogEntry>,
}

impl ExploitCatalog {
    pub async fn load(path: &Path) -> Result<Self, VulnBridgeError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            VulnBridgeError::Catalog(format!("Cannot read catalog {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, VulnBridgeError> {
        let raw: RawCatalog = serde_yaml::from_str(content)
            .map_err(|e| VulnBridgeError::Catalog(format!("Invalid catalog: {}", e)))?;

        let mut entries = Vec::with_capacity(raw.modules.len());
        for module in raw.modules {
            let mut fingerprints = Vec::with_capacity(module.fingerprints.len());
            for pattern in &module.fingerprints {
                let regex = Regex::new(pattern).map_err(|e| {
                    VulnBridgeError::Catalog(format!(
                        "Bad fingerprint pattern '{}' for {}: {}",
                        pattern, module.id, e
                    ))
                })?;
                fingerprints.push(regex);
            }
            entries.push(CatalogEntry {
                module_id: module.id,
                safe_mode: module.safe_mode,
                destructive: module.destructive,
                cves: module.cves.iter().map(|c| c.to_uppercase()).collect(),
                fingerprints,
                overrides: module.overrides,
            });
        }

        Ok(Self {
            version: raw.version,
            entries,
        })
    }

    pub fn entry(&self, module_id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.module_id == module_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
version: "2025-08"
modules:
  - id: exploit/multi/http/mod_x
    safe_mode: true
    cves: ["cve-2021-1234"]
  - id: exploit/linux/ssh/mod_y
    safe_mode: true
    fingerprints: ["OpenSSH [4-6]\\."]
  - id: auxiliary/dos/flood
    destructive: true
"#;

    #[test]
    fn test_catalog_parses_and_uppercases_cves() {
        let catalog = ExploitCatalog::from_yaml(CATALOG).unwrap();
        assert_eq!(catalog.version, "2025-08");
        assert_eq!(catalog.entries.len(), 3);
        assert_eq!(
            catalog.entry("exploit/multi/http/mod_x").unwrap().cves,
            vec!["CVE-2021-1234"]
        );
    }

    #[test]
    fn test_catalog_compiles_fingerprint_patterns() {
        let catalog = ExploitCatalog::from_yaml(CATALOG).unwrap();
        let entry = catalog.entry("exploit/linux/ssh/mod_y").unwrap();
        assert!(entry.fingerprints[0].is_match("OpenSSH 5.3p1 Debian"));
        assert!(!entry.fingerprints[0].is_match("OpenSSH 8.9"));
    }

    #[test]
    fn test_catalog_rejects_bad_pattern() {
        let bad = r#"
version: "1"
modules:
  - id: m
    fingerprints: ["("]
"#;
        assert!(matches!(
            ExploitCatalog::from_yaml(bad),
            Err(VulnBridgeError::Catalog(_))
        ));
    }

    #[test]
    fn test_catalog_defaults_unsafe() {
        let catalog = ExploitCatalog::from_yaml(CATALOG).unwrap();
        let flood = catalog.entry("auxiliary/dos/flood").unwrap();
        assert!(!flood.safe_mode);
        assert!(flood.destructive);
    }
}
