use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which external scan engine produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineTag {
    /// Web-server scanner (per-URL checks against HTTP services).
    WebScanner,
    /// Network vulnerability scanner (NVT-based host/port checks).
    NetworkScanner,
    /// Template-based scanner (rule/template matches).
    TemplateScanner,
}

impl EngineTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebScanner => "web-scanner",
            Self::NetworkScanner => "network-scanner",
            Self::TemplateScanner => "template-scanner",
        }
    }
}

impl std::fmt::Display for EngineTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized record of one potential vulnerability from one scan engine.
///
/// `engines` starts as the single producing engine; aggregation may merge
/// duplicate findings from other engines into the same record, keeping the
/// union of tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Stable identity, derived from engine, native id, host and port.
    /// Identical across runs so repeat findings collapse downstream.
    pub id: String,
    pub engines: Vec<EngineTag>,
    /// The finding/check identifier in the engine's own vocabulary
    /// (NVT OID, check reference, template id).
    pub native_id: String,
    pub host: String,
    pub port: u16,
    pub cve: Option<String>,
    /// Service/version banner, e.g. "OpenSSH 7.2p2 Ubuntu".
    pub fingerprint: Option<String>,
    pub template_id: Option<String>,
    /// Severity on the producing engine's native scale.
    pub raw_severity: f64,
    pub description: String,
    pub discovered_at: DateTime<Utc>,
}

impl Finding {
    /// Build the stable finding identity. Mirrors the per-finding keys the
    /// engine reports are correlated by: engine, native check id, host, port.
    pub fn make_id(engine: EngineTag, native_id: &str, host: &str, port: u16) -> String {
        format!("{}:{}:{}:{}", engine.as_str(), native_id, host, port)
    }

    /// Cross-engine similarity key: host + port + CVE-or-fingerprint.
    /// Findings with neither identifier return None and never deduplicate.
    pub fn vuln_key(&self) -> Option<String> {
        let ident = self
            .cve
            .as_deref()
            .or(self.fingerprint.as_deref())?;
        Some(format!("{}:{}:{}", self.host, self.port, ident))
    }

    /// Whether the finding carries anything the exploit matcher can key on.
    pub fn has_match_identifiers(&self) -> bool {
        self.cve.is_some() || self.fingerprint.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(cve: Option<&str>, fingerprint: Option<&str>) -> Finding {
        Finding {
            id: Finding::make_id(EngineTag::NetworkScanner, "nvt-1", "10.0.0.5", 443),
            engines: vec![EngineTag::NetworkScanner],
            native_id: "nvt-1".into(),
            host: "10.0.0.5".into(),
            port: 443,
            cve: cve.map(String::from),
            fingerprint: fingerprint.map(String::from),
            template_id: None,
            raw_severity: 7.5,
            description: "test".into(),
            discovered_at: Utc::now(),
        }
    }

    #[test]
    fn test_make_id_stable() {
        let a = Finding::make_id(EngineTag::WebScanner, "ref-99", "host", 80);
        let b = Finding::make_id(EngineTag::WebScanner, "ref-99", "host", 80);
        assert_eq!(a, b);
        assert_eq!(a, "web-scanner:ref-99:host:80");
    }

    #[test]
    fn test_vuln_key_prefers_cve() {
        let f = finding(Some("CVE-2021-1234"), Some("nginx 1.10"));
        assert_eq!(f.vuln_key().unwrap(), "10.0.0.5:443:CVE-2021-1234");
    }

    #[test]
    fn test_vuln_key_falls_back_to_fingerprint() {
        let f = finding(None, Some("nginx 1.10"));
        assert_eq!(f.vuln_key().unwrap(), "10.0.0.5:443:nginx 1.10");
    }

    #[test]
    fn test_vuln_key_none_without_identifiers() {
        let f = finding(None, None);
        assert!(f.vuln_key().is_none());
        assert!(!f.has_match_identifiers());
    }

    #[test]
    fn test_engine_tag_serde_kebab() {
        let json = serde_json::to_string(&EngineTag::TemplateScanner).unwrap();
        assert_eq!(json, "\"template-scanner\"");
        let parsed: EngineTag = serde_json::from_str("\"network-scanner\"").unwrap();
        assert_eq!(parsed, EngineTag::NetworkScanner);
    }
}
