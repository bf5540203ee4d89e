use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::remote::{ExploitService, RemoteJobState, SafeModeConfig};
use super::safety::{ModuleSpec, SafetyPolicy};
use crate::config::ValidationConfig;
use crate::errors::VulnBridgeError;
use crate::models::{Candidate, Outcome, RunWarning, ValidationState, Verdict};

/// One unit of validation work, owning everything the task needs.
#[derive(Debug, Clone)]
pub struct ValidationJob {
    pub candidate: Candidate,
    pub host: String,
    /// None when the candidate's module disappeared from the catalog.
    pub module: Option<ModuleSpec>,
}

/// Drives candidates through the validation state machine against the remote
/// exploitation service: queued → submitted → polling → terminal, with
/// skipped-unsafe short-circuiting before any submission.
#[derive(Clone)]
pub struct ValidationRunner {
    service: Arc<dyn ExploitService>,
    policy: SafetyPolicy,
    config: ValidationConfig,
    cancel_token: CancellationToken,
}

impl ValidationRunner {
    pub fn new(
        service: Arc<dyn ExploitService>,
        policy: SafetyPolicy,
        config: ValidationConfig,
    ) -> Self {
        Self {
            service,
            policy,
            config,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Replace the runner's cancel token with the run-level one so run
    /// cancellation propagates into in-flight validation jobs.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Validate one candidate. Submits at most one remote job; retrying is
    /// the caller's decision. Errors only on authentication failure, which
    /// is fatal for the whole validation phase.
    pub async fn validate(&self, job: &ValidationJob) -> Result<Outcome, VulnBridgeError> {
        let candidate = &job.candidate;
        let started_at = Utc::now();

        // Safety gate: rejected candidates never reach the remote service.
        if let Err(reason) = self.policy.check(&job.host, job.module.as_ref()) {
            info!(
                candidate = %candidate.id,
                module = %candidate.module_id,
                reason = %reason,
                "Candidate rejected by safety policy"
            );
            return Ok(Outcome {
                candidate_id: candidate.id.clone(),
                job_id: None,
                state: ValidationState::SkippedUnsafe,
                started_at,
                finished_at: Some(Utc::now()),
                evidence: reason,
                verdict: Verdict::SkippedUnsafe,
            });
        }

        debug!(candidate = %candidate.id, target = %job.host, "Submitting validation job");
        let job_id = match self
            .service
            .submit(&candidate.module_id, &job.host, &SafeModeConfig::default())
            .await
        {
            Ok(id) => id,
            Err(e) if e.classify().phase_fatal => return Err(e),
            Err(e) => {
                warn!(candidate = %candidate.id, error = %e, "Job submission failed");
                return Ok(self.terminal(
                    candidate,
                    None,
                    started_at,
                    ValidationState::Failed,
                    Verdict::Failed,
                    &e.to_string(),
                ));
            }
        };

        let deadline = Instant::now() + Duration::from_secs(self.config.timeout_secs);
        let poll_interval = Duration::from_secs(self.config.poll_interval_secs);

        loop {
            if Instant::now() >= deadline {
                warn!(candidate = %candidate.id, job_id = %job_id, "Validation timed out, cancelling remote job");
                self.cancel_remote(&job_id).await;
                return Ok(self.terminal(
                    candidate,
                    Some(&job_id),
                    started_at,
                    ValidationState::Inconclusive,
                    Verdict::Inconclusive,
                    "validation timed out before the remote job finished",
                ));
            }

            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!(candidate = %candidate.id, job_id = %job_id, "Run cancelled, cancelling remote job");
                    self.cancel_remote(&job_id).await;
                    return Ok(self.terminal(
                        candidate,
                        Some(&job_id),
                        started_at,
                        ValidationState::Inconclusive,
                        Verdict::Inconclusive,
                        "run cancelled while the remote job was in flight",
                    ));
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }

            match self.service.poll(&job_id).await {
                Ok(status) => match status.state {
                    RemoteJobState::Running => continue,
                    RemoteJobState::Confirmed => {
                        info!(candidate = %candidate.id, job_id = %job_id, "Exploitability confirmed in safe mode");
                        return Ok(self.terminal(
                            candidate,
                            Some(&job_id),
                            started_at,
                            ValidationState::Confirmed,
                            Verdict::Confirmed,
                            &status.evidence,
                        ));
                    }
                    RemoteJobState::Inconclusive => {
                        return Ok(self.terminal(
                            candidate,
                            Some(&job_id),
                            started_at,
                            ValidationState::Inconclusive,
                            Verdict::Inconclusive,
                            &status.evidence,
                        ));
                    }
                    RemoteJobState::Failed => {
                        return Ok(self.terminal(
                            candidate,
                            Some(&job_id),
                            started_at,
                            ValidationState::Failed,
                            Verdict::Failed,
                            &status.evidence,
                        ));
                    }
                },
                Err(e) if e.classify().phase_fatal => return Err(e),
                Err(e) => {
                    warn!(candidate = %candidate.id, job_id = %job_id, error = %e, "Polling failed");
                    return Ok(self.terminal(
                        candidate,
                        Some(&job_id),
                        started_at,
                        ValidationState::Failed,
                        Verdict::Failed,
                        &e.to_string(),
                    ));
                }
            }
        }
    }

    /// Validate a batch with bounded concurrency. The permit count caps
    /// simultaneous remote jobs; that bound is a safety requirement, not a
    /// throughput knob. On an authentication failure the phase aborts:
    /// unsubmitted candidates are left without outcomes and a warning is
    /// recorded, but already-produced outcomes are kept.
    pub async fn validate_all(&self, jobs: Vec<ValidationJob>) -> (Vec<Outcome>, Vec<RunWarning>) {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let phase_abort = CancellationToken::new();

        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let runner = self.clone();
                let semaphore = semaphore.clone();
                let phase_abort = phase_abort.clone();
                tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return None,
                    };
                    // Halt further submission once the run is cancelled or
                    // the phase has aborted; these candidates get no outcome.
                    if phase_abort.is_cancelled() || runner.cancel_token.is_cancelled() {
                        return None;
                    }
                    match runner.validate(&job).await {
                        Ok(outcome) => Some(Ok(outcome)),
                        Err(e) => {
                            phase_abort.cancel();
                            Some(Err(e))
                        }
                    }
                })
            })
            .collect();

        let mut outcomes = Vec::new();
        let mut warnings = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(Ok(outcome))) => outcomes.push(outcome),
                Ok(Some(Err(e))) => {
                    warnings.push(RunWarning::new(
                        "validate",
                        e.classify().error_type,
                        format!("validation phase aborted: {}", e),
                    ));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "Validation task panicked");
                    warnings.push(RunWarning::new(
                        "validate",
                        "InternalError",
                        format!("validation task panicked: {}", e),
                    ));
                }
            }
        }

        (outcomes, warnings)
    }

    fn terminal(
        &self,
        candidate: &Candidate,
        job_id: Option<&str>,
        started_at: chrono::DateTime<Utc>,
        state: ValidationState,
        verdict: Verdict,
        evidence: &str,
    ) -> Outcome {
        Outcome {
            candidate_id: candidate.id.clone(),
            job_id: job_id.map(String::from),
            state,
            started_at,
            finished_at: Some(Utc::now()),
            evidence: Outcome::truncate_evidence(evidence),
            verdict,
        }
    }

    async fn cancel_remote(&self, job_id: &str) {
        match self.service.cancel(job_id).await {
            Ok(true) => debug!(job_id = %job_id, "Remote job cancelled"),
            Ok(false) => warn!(job_id = %job_id, "Remote refused to cancel job"),
            Err(e) => warn!(job_id = %job_id, error = %e, "Remote job cancellation failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchBasis;
    use crate::validation::remote::RemoteJobStatus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fake service that advances every job to a fixed terminal state on the
    /// first poll, counting submissions.
    struct FakeService {
        result: RemoteJobState,
        submits: AtomicUsize,
        cancels: AtomicUsize,
        submit_error: Option<fn() -> VulnBridgeError>,
    }

    impl FakeService {
        fn completing_with(result: RemoteJobState) -> Self {
            Self {
                result,
                submits: AtomicUsize::new(0),
                cancels: AtomicUsize::new(0),
                submit_error: None,
            }
        }

        fn failing_submit(error: fn() -> VulnBridgeError) -> Self {
            Self {
                result: RemoteJobState::Failed,
                submits: AtomicUsize::new(0),
                cancels: AtomicUsize::new(0),
                submit_error: Some(error),
            }
        }
    }

    #[async_trait]
    impl ExploitService for FakeService {
        async fn submit(
            &self,
            _module_id: &str,
            _target: &str,
            safe_config: &SafeModeConfig,
        ) -> Result<String, VulnBridgeError> {
            assert!(safe_config.verify_only);
            if let Some(make_error) = self.submit_error {
                return Err(make_error());
            }
            let n = self.submits.fetch_add(1, Ordering::SeqCst);
            Ok(format!("job-{}", n))
        }

        async fn poll(&self, _job_id: &str) -> Result<RemoteJobStatus, VulnBridgeError> {
            Ok(RemoteJobStatus {
                state: self.result,
                evidence: "check output".into(),
            })
        }

        async fn cancel(&self, _job_id: &str) -> Result<bool, VulnBridgeError> {
            self.cancels.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    fn job(module: Option<ModuleSpec>) -> ValidationJob {
        ValidationJob {
            candidate: Candidate::new("f-1", "exploit/test/mod", MatchBasis::CveMatch, 0.9),
            host: "10.0.0.5".into(),
            module,
        }
    }

    fn safe_module() -> ModuleSpec {
        ModuleSpec {
            module_id: "exploit/test/mod".into(),
            safe_mode: true,
            destructive: false,
        }
    }

    fn fast_config() -> ValidationConfig {
        ValidationConfig {
            concurrency: 2,
            poll_interval_secs: 1,
            timeout_secs: 30,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_outcome() {
        let service = Arc::new(FakeService::completing_with(RemoteJobState::Confirmed));
        let runner = ValidationRunner::new(service.clone(), SafetyPolicy::default(), fast_config());

        let outcome = runner.validate(&job(Some(safe_module()))).await.unwrap();
        assert_eq!(outcome.state, ValidationState::Confirmed);
        assert_eq!(outcome.verdict, Verdict::Confirmed);
        assert_eq!(outcome.job_id.as_deref(), Some("job-0"));
        assert_eq!(outcome.evidence, "check output");
        assert_eq!(service.submits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsafe_module_never_submitted() {
        let service = Arc::new(FakeService::completing_with(RemoteJobState::Confirmed));
        let runner = ValidationRunner::new(service.clone(), SafetyPolicy::default(), fast_config());

        let unsafe_module = ModuleSpec {
            module_id: "exploit/test/mod".into(),
            safe_mode: false,
            destructive: false,
        };
        let outcome = runner.validate(&job(Some(unsafe_module))).await.unwrap();
        assert_eq!(outcome.state, ValidationState::SkippedUnsafe);
        assert_eq!(outcome.verdict, Verdict::SkippedUnsafe);
        assert!(outcome.job_id.is_none());
        // Zero submit calls is the contract, not an optimization
        assert_eq!(service.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remote_unavailable_yields_failed_outcome() {
        let service = Arc::new(FakeService::failing_submit(|| {
            VulnBridgeError::RemoteUnavailable("connection refused".into())
        }));
        let runner = ValidationRunner::new(service, SafetyPolicy::default(), fast_config());

        let outcome = runner.validate(&job(Some(safe_module()))).await.unwrap();
        assert_eq!(outcome.verdict, Verdict::Failed);
        assert!(outcome.evidence.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_auth_error_propagates() {
        let service = Arc::new(FakeService::failing_submit(|| {
            VulnBridgeError::Authentication("bad token".into())
        }));
        let runner = ValidationRunner::new(service, SafetyPolicy::default(), fast_config());

        let result = runner.validate(&job(Some(safe_module()))).await;
        assert!(matches!(result, Err(VulnBridgeError::Authentication(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancels_and_reports_inconclusive() {
        struct NeverDone;
        #[async_trait]
        impl ExploitService for NeverDone {
            async fn submit(
                &self,
                _m: &str,
                _t: &str,
                _s: &SafeModeConfig,
            ) -> Result<String, VulnBridgeError> {
                Ok("job-slow".into())
            }
            async fn poll(&self, _j: &str) -> Result<RemoteJobStatus, VulnBridgeError> {
                Ok(RemoteJobStatus {
                    state: RemoteJobState::Running,
                    evidence: String::new(),
                })
            }
            async fn cancel(&self, _j: &str) -> Result<bool, VulnBridgeError> {
                Ok(true)
            }
        }

        let config = ValidationConfig {
            concurrency: 1,
            poll_interval_secs: 1,
            timeout_secs: 3,
        };
        let runner = ValidationRunner::new(Arc::new(NeverDone), SafetyPolicy::default(), config);
        let outcome = runner.validate(&job(Some(safe_module()))).await.unwrap();
        assert_eq!(outcome.verdict, Verdict::Inconclusive);
        assert!(outcome.evidence.contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_validate_all_continues_past_one_failure() {
        // One candidate hits an unavailable service; the rest complete.
        struct FifthFails {
            submits: AtomicUsize,
        }
        #[async_trait]
        impl ExploitService for FifthFails {
            async fn submit(
                &self,
                _m: &str,
                target: &str,
                _s: &SafeModeConfig,
            ) -> Result<String, VulnBridgeError> {
                if target == "10.0.0.13" {
                    return Err(VulnBridgeError::RemoteUnavailable("refused".into()));
                }
                let n = self.submits.fetch_add(1, Ordering::SeqCst);
                Ok(format!("job-{}", n))
            }
            async fn poll(&self, _j: &str) -> Result<RemoteJobStatus, VulnBridgeError> {
                Ok(RemoteJobStatus {
                    state: RemoteJobState::Confirmed,
                    evidence: String::new(),
                })
            }
            async fn cancel(&self, _j: &str) -> Result<bool, VulnBridgeError> {
                Ok(true)
            }
        }

        let runner = ValidationRunner::new(
            Arc::new(FifthFails {
                submits: AtomicUsize::new(0),
            }),
            SafetyPolicy::default(),
            fast_config(),
        );

        let jobs: Vec<ValidationJob> = (10..15)
            .map(|n| ValidationJob {
                candidate: Candidate::new(
                    &format!("f-{}", n),
                    "exploit/test/mod",
                    MatchBasis::CveMatch,
                    0.9,
                ),
                host: format!("10.0.0.{}", n),
                module: Some(safe_module()),
            })
            .collect();

        let (outcomes, warnings) = runner.validate_all(jobs).await;
        assert_eq!(outcomes.len(), 5);
        assert!(warnings.is_empty());
        let failed: Vec<_> = outcomes
            .iter()
            .filter(|o| o.verdict == Verdict::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| o.verdict == Verdict::Confirmed)
                .count(),
            4
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_validate_all_auth_aborts_phase() {
        let service = Arc::new(FakeService::failing_submit(|| {
            VulnBridgeError::Authentication("expired".into())
        }));
        let config = ValidationConfig {
            concurrency: 1,
            poll_interval_secs: 1,
            timeout_secs: 5,
        };
        let runner = ValidationRunner::new(service, SafetyPolicy::default(), config);

        let jobs: Vec<ValidationJob> = (0..4)
            .map(|n| ValidationJob {
                candidate: Candidate::new(
                    &format!("f-{}", n),
                    "exploit/test/mod",
                    MatchBasis::CveMatch,
                    0.9,
                ),
                host: format!("10.0.1.{}", n),
                module: Some(safe_module()),
            })
            .collect();

        let (outcomes, warnings) = runner.validate_all(jobs).await;
        assert!(outcomes.is_empty());
        assert!(!warnings.is_empty());
        assert_eq!(warnings[0].error_type, "AuthenticationError");
    }
}
