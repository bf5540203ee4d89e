use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::state::{RunPhase, RunState, RunStatus, RunSummary};
use crate::aggregate::aggregate;
use crate::config::AppConfig;
use crate::db::Database;
use crate::engines::{normalize, HttpScanEngine, RawResults, ScanEngineAdapter};
use crate::errors::{with_retry, RetryConfig, VulnBridgeError};
use crate::matcher::{match_finding, ExploitCatalog};
use crate::models::{Candidate, EngineTag, Finding, Report, RunWarning};
use crate::reporting::{FileReportSink, ReportSink};
use crate::validation::{
    ExploitService, HttpExploitService, ModuleSpec, SafetyPolicy, ValidationJob, ValidationRunner,
};

/// Drives one full run: ingest scan results, match exploit modules, validate
/// in safe mode, aggregate, publish. Every run yields a report; per-engine
/// and per-candidate failures become report warnings, not run failures.
pub struct RunOrchestrator {
    config: AppConfig,
    catalog: Arc<ExploitCatalog>,
    adapters: Vec<Arc<dyn ScanEngineAdapter>>,
    service: Arc<dyn ExploitService>,
    sink: Arc<dyn ReportSink>,
    db: Database,
    retry: RetryConfig,
    state: Arc<RwLock<RunState>>,
    cancel_token: CancellationToken,
}

impl RunOrchestrator {
    pub fn new(
        config: AppConfig,
        catalog: Arc<ExploitCatalog>,
        adapters: Vec<Arc<dyn ScanEngineAdapter>>,
        service: Arc<dyn ExploitService>,
        sink: Arc<dyn ReportSink>,
        db: Database,
    ) -> Self {
        Self {
            config,
            catalog,
            adapters,
            service,
            sink,
            db,
            retry: RetryConfig::default(),
            state: Arc::new(RwLock::new(RunState::new("pending"))),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Wire up the production setup: HTTP adapters for every enabled engine,
    /// the remote exploitation service, and a file sink.
    pub async fn from_config(config: AppConfig, db: Database) -> Result<Self, VulnBridgeError> {
        let catalog = Arc::new(ExploitCatalog::load(Path::new(&config.catalog.path)).await?);

        let mut adapters: Vec<Arc<dyn ScanEngineAdapter>> = Vec::new();
        for tag in [
            EngineTag::WebScanner,
            EngineTag::NetworkScanner,
            EngineTag::TemplateScanner,
        ] {
            let engine = config.engines.for_tag(tag);
            if !engine.enabled {
                continue;
            }
            match &engine.endpoint {
                Some(endpoint) => {
                    adapters.push(Arc::new(HttpScanEngine::new(tag, endpoint)));
                }
                None => {
                    warn!(engine = %tag, "Engine enabled but no endpoint configured, skipping");
                }
            }
        }

        let service = Arc::new(HttpExploitService::new(
            &config.remote.endpoint,
            config.remote.token.as_deref(),
        ));
        let sink = Arc::new(FileReportSink::new(&config.output.directory));

        Ok(Self::new(config, catalog, adapters, service, sink, db))
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn state(&self) -> Arc<RwLock<RunState>> {
        self.state.clone()
    }

    /// Execute one run end to end. Errors only on faults that make the run
    /// itself impossible to finish, such as a broken run database.
    pub async fn run(&self, schedule_id: Option<&str>) -> Result<Report, VulnBridgeError> {
        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, schedule_id = ?schedule_id, "Run started");

        self.db.create_run(&run_id, schedule_id)?;
        self.db.update_run_status(&run_id, "running")?;
        {
            let mut state = self.state.write().await;
            *state = RunState::new(&run_id);
            state.status = RunStatus::Running;
        }

        match self.execute(&run_id).await {
            Ok(report) => {
                self.db.finish_run(&report)?;
                self.update_status(RunStatus::Completed, None).await;
                let summary = RunSummary::from_report(&report);
                info!(
                    run_id = %run_id,
                    findings = summary.total_findings,
                    candidates = summary.candidates,
                    confirmed = summary.confirmed,
                    warnings = summary.warnings,
                    duration_ms = summary.duration_ms,
                    "Run completed"
                );
                Ok(report)
            }
            Err(e) => {
                self.db.mark_run_failed(&run_id, &e.to_string())?;
                self.update_status(RunStatus::Failed, Some(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    async fn execute(&self, run_id: &str) -> Result<Report, VulnBridgeError> {
        let started_at = Utc::now();
        let mut warnings: Vec<RunWarning> = Vec::new();

        // Ingest: every engine fetched concurrently, each failure isolated.
        self.set_phase(RunPhase::Ingest).await;
        let findings = self.ingest(&mut warnings).await;
        info!(run_id = %run_id, findings = findings.len(), "Ingest complete");

        // Match: pure lookup against the catalog, deterministic per finding.
        self.set_phase(RunPhase::Match).await;
        let (candidates, jobs) = self.match_phase(&findings);
        info!(run_id = %run_id, candidates = candidates.len(), "Matching complete");

        // Validate: bounded concurrency against the exploitation service.
        self.set_phase(RunPhase::Validate).await;
        let policy = SafetyPolicy::from_config(&self.config.safety);
        let runner = ValidationRunner::new(
            self.service.clone(),
            policy,
            self.config.validation.clone(),
        )
        .with_cancel_token(self.cancel_token.clone());
        let (outcomes, validation_warnings) = runner.validate_all(jobs).await;
        warnings.extend(validation_warnings);
        info!(run_id = %run_id, outcomes = outcomes.len(), "Validation complete");

        // Aggregate is pure; everything time-dependent is already pinned.
        self.set_phase(RunPhase::Aggregate).await;
        let report = aggregate(
            run_id,
            started_at,
            Utc::now(),
            findings,
            candidates,
            outcomes,
            &self.config.severity,
            warnings,
        );

        self.set_phase(RunPhase::Publish).await;
        if let Err(e) = self.sink.publish(&report).await {
            warn!(run_id = %run_id, error = %e, "Report publication failed; report kept in run database");
        }

        Ok(report)
    }

    async fn ingest(&self, warnings: &mut Vec<RunWarning>) -> Vec<Finding> {
        let fetches = self.adapters.iter().map(|adapter| {
            let tag = adapter.tag();
            let targets = self.config.engines.for_tag(tag).targets.clone();
            let retry = self.retry.clone();
            async move {
                let operation = format!("{} fetch", tag);
                let result: Result<RawResults, VulnBridgeError> =
                    with_retry(&operation, &retry, || adapter.fetch_results(&targets)).await;
                (tag, result)
            }
        });

        let mut findings = Vec::new();
        for (tag, result) in futures::future::join_all(fetches).await {
            match result {
                Ok(raw) => {
                    let (mut engine_findings, engine_warnings) = normalize(tag, &raw);
                    info!(
                        engine = %tag,
                        records = raw.len(),
                        findings = engine_findings.len(),
                        malformed = engine_warnings.len(),
                        "Engine results normalized"
                    );
                    findings.append(&mut engine_findings);
                    warnings.extend(engine_warnings);
                }
                Err(e) => {
                    warn!(engine = %tag, error = %e, "Engine results unavailable");
                    warnings.push(RunWarning::new(
                        "ingest",
                        e.classify().error_type,
                        format!("{} results unavailable: {}", tag, e),
                    ));
                }
            }
        }
        findings
    }

    fn match_phase(&self, findings: &[Finding]) -> (Vec<Candidate>, Vec<ValidationJob>) {
        let mut candidates = Vec::new();
        let mut jobs = Vec::new();
        for finding in findings {
            let matched = match_finding(finding, &self.catalog, &self.config.matcher);
            for candidate in &matched {
                let module = self
                    .catalog
                    .entry(&candidate.module_id)
                    .map(|entry| ModuleSpec {
                        module_id: entry.module_id.clone(),
                        safe_mode: entry.safe_mode,
                        destructive: entry.destructive,
                    });
                jobs.push(ValidationJob {
                    candidate: candidate.clone(),
                    host: finding.host.clone(),
                    module,
                });
            }
            candidates.extend(matched);
        }
        (candidates, jobs)
    }

    async fn set_phase(&self, phase: RunPhase) {
        let mut state = self.state.write().await;
        state.current_phase = Some(phase);
    }

    async fn update_status(&self, status: RunStatus, error: Option<String>) {
        let mut state = self.state.write().await;
        state.status = status;
        state.error = error;
    }
}
