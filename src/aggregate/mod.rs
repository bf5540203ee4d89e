use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::SeverityConfig;
use crate::models::{
    Candidate, EngineTag, Finding, Outcome, Report, ReportEntry, RunWarning, SeveritySummary,
};

/// Linear per-engine mapping from engine-native severity to the 0-10 scale.
/// The network scanner already reports CVSS-like 0-10; the other two report
/// 0-4 ranks.
pub fn normalize_severity(engine: EngineTag, raw: f64) -> f64 {
    let normalized = match engine {
        EngineTag::NetworkScanner => raw,
        EngineTag::WebScanner | EngineTag::TemplateScanner => raw * 2.5,
    };
    normalized.clamp(0.0, 10.0)
}

/// Merge findings, candidates and outcomes into the final report model.
///
/// Pure and deterministic: identical inputs always serialize to an identical
/// report. No clocks, no randomness, no I/O.
///
/// Deduplication key is host + port + CVE-or-fingerprint; findings with
/// neither identifier never merge. A merged finding keeps the union of
/// engine tags, the raw severity of whichever duplicate normalizes highest,
/// and the first duplicate's position in discovery order.
#[allow(clippy::too_many_arguments)]
pub fn aggregate(
    run_id: &str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    findings: Vec<Finding>,
    candidates: Vec<Candidate>,
    outcomes: Vec<Outcome>,
    severity: &SeverityConfig,
    warnings: Vec<RunWarning>,
) -> Report {
    // Normalize severity per finding before merging; each record's score is
    // defined by its own producing engine's scale.
    let scored: Vec<(Finding, f64)> = findings
        .into_iter()
        .map(|f| {
            let engine = f.engines.first().copied().unwrap_or(EngineTag::NetworkScanner);
            let score = normalize_severity(engine, f.raw_severity);
            (f, score)
        })
        .collect();

    // Merge duplicates in discovery order.
    let mut merged: Vec<(Finding, f64, Vec<String>)> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();
    for (finding, score) in scored {
        let key = finding.vuln_key();
        let slot = key.and_then(|k| by_key.get(&k).copied());
        match slot {
            Some(index) => {
                let (existing, existing_score, finding_ids) = &mut merged[index];
                finding_ids.push(finding.id.clone());
                for tag in &finding.engines {
                    if !existing.engines.contains(tag) {
                        existing.engines.push(*tag);
                    }
                }
                existing.engines.sort();
                if score > *existing_score {
                    existing.raw_severity = finding.raw_severity;
                    *existing_score = score;
                }
                // Prefer whichever duplicate carries identifiers the other lacks
                if existing.cve.is_none() {
                    existing.cve = finding.cve;
                }
                if existing.fingerprint.is_none() {
                    existing.fingerprint = finding.fingerprint;
                }
                if existing.template_id.is_none() {
                    existing.template_id = finding.template_id;
                }
            }
            None => {
                if let Some(k) = finding.vuln_key() {
                    by_key.insert(k, merged.len());
                }
                let id = finding.id.clone();
                merged.push((finding, score, vec![id]));
            }
        }
    }

    // Attach candidates and outcomes by id, never by completion order.
    let mut candidates_by_finding: HashMap<&str, Vec<&Candidate>> = HashMap::new();
    for candidate in &candidates {
        candidates_by_finding
            .entry(candidate.finding_id.as_str())
            .or_default()
            .push(candidate);
    }
    let mut outcomes_by_candidate: HashMap<&str, Vec<&Outcome>> = HashMap::new();
    for outcome in &outcomes {
        outcomes_by_candidate
            .entry(outcome.candidate_id.as_str())
            .or_default()
            .push(outcome);
    }

    let mut entries = Vec::with_capacity(merged.len());
    let mut summary = SeveritySummary::default();

    for (finding, score, finding_ids) in merged {
        let mut entry_candidates: Vec<Candidate> = finding_ids
            .iter()
            .flat_map(|id| {
                candidates_by_finding
                    .get(id.as_str())
                    .into_iter()
                    .flatten()
                    .map(|c| (*c).clone())
            })
            .collect();
        entry_candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.module_id.cmp(&b.module_id))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut entry_outcomes: Vec<Outcome> = entry_candidates
            .iter()
            .flat_map(|c| {
                outcomes_by_candidate
                    .get(c.id.as_str())
                    .into_iter()
                    .flatten()
                    .map(|o| (*o).clone())
            })
            .collect();
        entry_outcomes.sort_by(|a, b| {
            a.candidate_id
                .cmp(&b.candidate_id)
                .then_with(|| a.started_at.cmp(&b.started_at))
        });

        let confirmed = ReportEntry::any_confirmed(&entry_outcomes);
        let normalized_severity = if confirmed {
            // Confirmed exploitability must not read as low severity
            score.max(severity.confirmed_floor)
        } else {
            score
        };

        let entry = ReportEntry {
            finding,
            normalized_severity,
            confirmed,
            candidates: entry_candidates,
            outcomes: entry_outcomes,
        };
        summary.count(&entry);
        entries.push(entry);
    }

    Report {
        run_id: run_id.to_string(),
        started_at,
        finished_at,
        entries,
        summary,
        warnings,
    }
}
