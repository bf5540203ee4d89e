use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use super::RawResults;
use crate::errors::VulnBridgeError;
use crate::models::outcome::floor_char_boundary;
use crate::models::{EngineTag, Finding, RunWarning};

/// Convert one engine's raw records into canonical findings.
///
/// A record that cannot yield at least host + severity is dropped and
/// recorded as a warning against the run; one bad record never aborts
/// ingestion. Optional fields stay unset rather than defaulted.
pub fn normalize(tag: EngineTag, raw: &RawResults) -> (Vec<Finding>, Vec<RunWarning>) {
    let mut findings = Vec::new();
    let mut warnings = Vec::new();

    for record in raw {
        let parsed = match tag {
            EngineTag::WebScanner => normalize_web(record),
            EngineTag::NetworkScanner => normalize_network(record),
            EngineTag::TemplateScanner => normalize_template(record),
        };
        match parsed {
            Ok(finding) => findings.push(finding),
            Err(e) => {
                debug!(engine = %tag, error = %e, "Dropping malformed record");
                warnings.push(RunWarning::new("normalize", "MalformedResultError", e.to_string()));
            }
        }
    }

    (findings, warnings)
}

/// Web-server scanner rows: `Host IP`/`Hostname`, `Port`, `Reference`,
/// `Description`, numeric `Severity` (0-4), optional `Server` banner.
fn normalize_web(record: &Value) -> Result<Finding, VulnBridgeError> {
    let host = str_field(record, "Host IP")
        .or_else(|| str_field(record, "Hostname"))
        .ok_or_else(|| malformed("web record missing Host IP/Hostname", record))?;
    let raw_severity = num_field(record, "Severity")
        .ok_or_else(|| malformed("web record missing Severity", record))?;
    let port = port_field(record, "Port").unwrap_or(80);

    let reference = str_field(record, "Reference");
    let description = str_field(record, "Description").unwrap_or_default();
    let native_id = reference
        .clone()
        .unwrap_or_else(|| description.clone());
    if native_id.is_empty() {
        return Err(malformed("web record has neither Reference nor Description", record));
    }

    let cve = reference.filter(|r| r.starts_with("CVE-"));

    Ok(Finding {
        id: Finding::make_id(EngineTag::WebScanner, &native_id, &host, port),
        engines: vec![EngineTag::WebScanner],
        native_id,
        host,
        port,
        cve,
        fingerprint: str_field(record, "Server"),
        template_id: None,
        raw_severity,
        description,
        discovered_at: Utc::now(),
    })
}

/// Network scanner rows: `IP`/`Host`, `Port` (possibly `443/tcp`), `CVSS`,
/// `NVT OID`, `NVT Name`, `CVEs` (comma list, `NOCVE` when empty),
/// optional `Product`.
fn normalize_network(record: &Value) -> Result<Finding, VulnBridgeError> {
    let host = str_field(record, "IP")
        .or_else(|| str_field(record, "Host"))
        .ok_or_else(|| malformed("network record missing IP/Host", record))?;
    let raw_severity = num_field(record, "CVSS")
        .ok_or_else(|| malformed("network record missing CVSS", record))?;
    let port = port_field(record, "Port").unwrap_or(0);

    let native_id = str_field(record, "NVT OID")
        .or_else(|| str_field(record, "NVT Name"))
        .ok_or_else(|| malformed("network record missing NVT OID/Name", record))?;

    let cve = str_field(record, "CVEs").and_then(|list| {
        list.split(',')
            .map(str::trim)
            .find(|c| c.starts_with("CVE-"))
            .map(String::from)
    });

    Ok(Finding {
        id: Finding::make_id(EngineTag::NetworkScanner, &native_id, &host, port),
        engines: vec![EngineTag::NetworkScanner],
        native_id,
        host,
        port,
        cve,
        fingerprint: str_field(record, "Product"),
        template_id: None,
        raw_severity,
        description: str_field(record, "NVT Name").unwrap_or_default(),
        discovered_at: Utc::now(),
    })
}

/// Template scanner records: `template-id`, `host` (may be a URL),
/// `info.severity` (textual), optional `info.classification.cve-id` and
/// `service`.
fn normalize_template(record: &Value) -> Result<Finding, VulnBridgeError> {
    let template_id = str_field(record, "template-id")
        .ok_or_else(|| malformed("template record missing template-id", record))?;
    let raw_host = str_field(record, "host")
        .or_else(|| str_field(record, "ip"))
        .ok_or_else(|| malformed("template record missing host", record))?;
    let severity_text = record
        .pointer("/info/severity")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("template record missing info.severity", record))?;
    let raw_severity = severity_ordinal(severity_text)
        .ok_or_else(|| malformed("template record has unknown severity", record))?;

    let (host, port) = split_host_port(&raw_host);
    let cve = record
        .pointer("/info/classification/cve-id")
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => items.first().and_then(Value::as_str).map(String::from),
            _ => None,
        })
        .map(|c| c.to_uppercase());

    Ok(Finding {
        id: Finding::make_id(EngineTag::TemplateScanner, &template_id, &host, port),
        engines: vec![EngineTag::TemplateScanner],
        native_id: template_id.clone(),
        host,
        port,
        cve,
        fingerprint: str_field(record, "service"),
        template_id: Some(template_id),
        raw_severity,
        description: record
            .pointer("/info/name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        discovered_at: Utc::now(),
    })
}

/// Textual severity rank on the template scanner's own scale.
fn severity_ordinal(text: &str) -> Option<f64> {
    match text.to_ascii_lowercase().as_str() {
        "info" | "unknown" => Some(0.0),
        "low" => Some(1.0),
        "medium" => Some(2.0),
        "high" => Some(3.0),
        "critical" => Some(4.0),
        _ => None,
    }
}

fn str_field(record: &Value, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn num_field(record: &Value, key: &str) -> Option<f64> {
    let value = record.get(key)?;
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Port fields arrive as numbers, strings, or `443/tcp` notation.
fn port_field(record: &Value, key: &str) -> Option<u16> {
    let value = record.get(key)?;
    if let Some(n) = value.as_u64() {
        return u16::try_from(n).ok();
    }
    let text = value.as_str()?;
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Split `https://host:8443/path` or `host:port` into (host, port).
fn split_host_port(raw: &str) -> (String, u16) {
    let after_scheme = raw.splitn(2, "://").last().unwrap_or(raw);
    let default_port = if raw.starts_with("https://") { 443 } else { 80 };
    let host_port = after_scheme.split('/').next().unwrap_or(after_scheme);
    match host_port.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(p) => (host.to_string(), p),
            Err(_) => (host_port.to_string(), default_port),
        },
        None => (host_port.to_string(), default_port),
    }
}

fn malformed(reason: &str, record: &Value) -> VulnBridgeError {
    let excerpt = record.to_string();
    // Serialized records are arbitrary UTF-8; cut on a char boundary
    let excerpt = if excerpt.len() > 200 {
        let cut = floor_char_boundary(&excerpt, 200);
        format!("{}...", &excerpt[..cut])
    } else {
        excerpt
    };
    VulnBridgeError::MalformedResult(format!("{reason}: {excerpt}"))
}
