pub mod catalog;

pub use catalog::{CatalogEntry, ExploitCatalog};

use crate::config::MatcherConfig;
use crate::models::{Candidate, Finding, MatchBasis};

/// Map one finding to candidate exploit modules.
///
/// Policy, per catalog entry, first basis wins: operator override (1.0),
/// exact CVE id (configured weight, default 0.9), fingerprint regex
/// (configured weight, default 0.6). A finding with no identifiers yields
/// nothing and simply carries forward to the report unmatched.
///
/// Deterministic: identical (finding, catalog, weights) always produce the
/// same candidates, sorted by descending confidence then ascending module id.
pub fn match_finding(
    finding: &Finding,
    catalog: &ExploitCatalog,
    weights: &MatcherConfig,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for entry in &catalog.entries {
        if let Some(basis) = entry_basis(finding, entry) {
            let confidence = match basis {
                MatchBasis::ManualOverride => 1.0,
                MatchBasis::CveMatch => weights.cve_confidence,
                MatchBasis::FingerprintMatch => weights.fingerprint_confidence,
            };
            candidates.push(Candidate::new(
                &finding.id,
                &entry.module_id,
                basis,
                confidence,
            ));
        }
    }

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.module_id.cmp(&b.module_id))
    });
    candidates
}

fn entry_basis(finding: &Finding, entry: &CatalogEntry) -> Option<MatchBasis> {
    if entry
        .overrides
        .iter()
        .any(|o| o == &finding.native_id || o == &finding.id)
    {
        return Some(MatchBasis::ManualOverride);
    }

    if let Some(cve) = &finding.cve {
        let cve = cve.to_uppercase();
        if entry.cves.iter().any(|c| c == &cve) {
            return Some(MatchBasis::CveMatch);
        }
    }

    if let Some(fingerprint) = &finding.fingerprint {
        if entry.fingerprints.iter().any(|p| p.is_match(fingerprint)) {
            return Some(MatchBasis::FingerprintMatch);
        }
    }

    None
}
