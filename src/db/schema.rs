pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS runs (
    id TEXT PRIMARY KEY,
    schedule_id TEXT,
    status TEXT NOT NULL DEFAULT 'queued',
    finding_count INTEGER DEFAULT 0,
    candidate_count INTEGER DEFAULT 0,
    outcome_count INTEGER DEFAULT 0,
    confirmed_count INTEGER DEFAULT 0,
    warning_count INTEGER DEFAULT 0,
    report_json TEXT,
    error_message TEXT,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_runs_schedule ON runs(schedule_id);
CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);
";
