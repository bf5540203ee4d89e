use crate::models::{Report, ReportEntry};

pub fn format_entry_markdown(entry: &ReportEntry) -> String {
    let f = &entry.finding;
    let identifier = f
        .cve
        .as_deref()
        .or(f.fingerprint.as_deref())
        .unwrap_or("unmatched");

    let mut section = format!(
        "### {}:{} {}\n\n**Severity:** {:.1} ({})\n**Engines:** {}\n**Confirmed:** {}\n\n{}\n",
        f.host,
        f.port,
        identifier,
        entry.normalized_severity,
        entry.severity_band(),
        f.engines
            .iter()
            .map(|e| e.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        if entry.confirmed { "yes" } else { "no" },
        f.description,
    );

    for outcome in &entry.outcomes {
        section.push_str(&format!(
            "\n**Validation ({}):** {}\n",
            outcome.candidate_id,
            outcome.verdict.as_str()
        ));
        if !outcome.evidence.is_empty() {
            section.push_str(&format!("```\n{}\n```\n", outcome.evidence));
        }
    }
    section
}

pub fn format_executive_summary(report: &Report) -> String {
    let s = &report.summary;
    format!(
        "## Executive Summary\n\n| Severity | Count |\n|---|---|\n| Critical | {} |\n| High | {} |\n| Medium | {} |\n| Low | {} |\n| Info | {} |\n| **Total** | **{}** |\n\n**Confirmed exploitable:** {}\n",
        s.critical, s.high, s.medium, s.low, s.info, s.total, s.confirmed
    )
}

pub fn format_report_markdown(report: &Report) -> String {
    let mut out = format!(
        "# Vulnerability Validation Report\n\n**Run:** {}\n**Started:** {}\n**Finished:** {}\n\n",
        report.run_id,
        report.started_at.to_rfc3339(),
        report.finished_at.to_rfc3339(),
    );
    out.push_str(&format_executive_summary(report));

    if report.entries.is_empty() {
        out.push_str("\nNo findings were reported in this run.\n");
        return out;
    }

    out.push_str("\n---\n\n");
    // Highest severity first, confirmed findings ahead of unconfirmed at equal score.
    let mut ordered: Vec<&ReportEntry> = report.entries.iter().collect();
    ordered.sort_by(|a, b| {
        b.normalized_severity
            .partial_cmp(&a.normalized_severity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.confirmed.cmp(&a.confirmed))
    });
    for entry in ordered {
        out.push_str(&format_entry_markdown(entry));
        out.push_str("\n---\n\n");
    }

    if !report.warnings.is_empty() {
        out.push_str("## Warnings\n\n");
        for w in &report.warnings {
            out.push_str(&format!("- [{}] {}: {}\n", w.phase, w.error_type, w.message));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Report, SeveritySummary};
    use chrono::Utc;

    #[test]
    fn test_empty_report_markdown() {
        let report = Report {
            run_id: "run-1".into(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            entries: vec![],
            summary: SeveritySummary::default(),
            warnings: vec![],
        };
        let md = format_report_markdown(&report);
        assert!(md.contains("No findings were reported"));
        assert!(md.contains("run-1"));
    }

    #[test]
    fn test_summary_table_counts() {
        let mut summary = SeveritySummary::default();
        summary.critical = 2;
        summary.confirmed = 1;
        summary.total = 3;
        let report = Report {
            run_id: "run-2".into(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            entries: vec![],
            summary,
            warnings: vec![],
        };
        let md = format_executive_summary(&report);
        assert!(md.contains("| Critical | 2 |"));
        assert!(md.contains("**Confirmed exploitable:** 1"));
    }
}
