use serde::{Deserialize, Serialize};

/// What kind of evidence linked a finding to an exploit module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchBasis {
    CveMatch,
    FingerprintMatch,
    ManualOverride,
}

/// A proposed exploit module for one finding.
///
/// Confidence is deterministic for a given finding + catalog version; the
/// matcher never injects randomness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub finding_id: String,
    pub module_id: String,
    pub basis: MatchBasis,
    pub confidence: f64,
}

impl Candidate {
    pub fn new(finding_id: &str, module_id: &str, basis: MatchBasis, confidence: f64) -> Self {
        Self {
            id: format!("{}::{}", finding_id, module_id),
            finding_id: finding_id.to_string(),
            module_id: module_id.to_string(),
            basis,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_id_derived_from_finding_and_module() {
        let c = Candidate::new("f-1", "exploit/linux/http/mod_x", MatchBasis::CveMatch, 0.9);
        assert_eq!(c.id, "f-1::exploit/linux/http/mod_x");
        assert_eq!(c.confidence, 0.9);
    }

    #[test]
    fn test_match_basis_serde() {
        let json = serde_json::to_string(&MatchBasis::FingerprintMatch).unwrap();
        assert_eq!(json, "\"fingerprint-match\"");
    }
}
