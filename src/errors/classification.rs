use super::types::VulnBridgeError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
    /// True when the error invalidates the rest of its pipeline phase,
    /// not just the record or candidate it occurred on.
    pub phase_fatal: bool,
}

impl VulnBridgeError {
    /// Classify this error: its type label, whether the operation can be
    /// retried, and whether it aborts the surrounding pipeline phase.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Transient remote failures — retry, then recover per-candidate
            VulnBridgeError::RemoteUnavailable(_) => ErrorClassification {
                error_type: "RemoteUnavailableError",
                retryable: true,
                phase_fatal: false,
            },
            VulnBridgeError::Network(_) => ErrorClassification {
                error_type: "NetworkError",
                retryable: true,
                phase_fatal: false,
            },
            VulnBridgeError::Timeout(_) => ErrorClassification {
                error_type: "TimeoutError",
                retryable: true,
                phase_fatal: false,
            },
            VulnBridgeError::Http(_) => ErrorClassification {
                error_type: "HttpError",
                retryable: true,
                phase_fatal: false,
            },
            VulnBridgeError::ScanEngine(_) => ErrorClassification {
                error_type: "ScanEngineError",
                retryable: true,
                phase_fatal: false,
            },

            // Credentials cannot heal on their own; the whole phase stops
            VulnBridgeError::Authentication(_) => ErrorClassification {
                error_type: "AuthenticationError",
                retryable: false,
                phase_fatal: true,
            },
            VulnBridgeError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                retryable: false,
                phase_fatal: true,
            },
            VulnBridgeError::Catalog(_) => ErrorClassification {
                error_type: "CatalogError",
                retryable: false,
                phase_fatal: true,
            },

            // Per-record / per-candidate, recovered in place
            VulnBridgeError::MalformedResult(_) => ErrorClassification {
                error_type: "MalformedResultError",
                retryable: false,
                phase_fatal: false,
            },
            VulnBridgeError::SafetyPolicy(_) => ErrorClassification {
                error_type: "SafetyPolicyViolation",
                retryable: false,
                phase_fatal: false,
            },

            VulnBridgeError::Scheduler(_) => ErrorClassification {
                error_type: "SchedulerError",
                retryable: false,
                phase_fatal: false,
            },
            VulnBridgeError::Database(_) => ErrorClassification {
                error_type: "DatabaseError",
                retryable: true,
                phase_fatal: false,
            },
            VulnBridgeError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: true,
                phase_fatal: false,
            },
            VulnBridgeError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: false,
                phase_fatal: false,
            },
            VulnBridgeError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: false,
                phase_fatal: false,
            },
            VulnBridgeError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                retryable: true,
                phase_fatal: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_unavailable_retryable_not_fatal() {
        let err = VulnBridgeError::RemoteUnavailable("connection refused".into());
        let class = err.classify();
        assert!(class.retryable);
        assert!(!class.phase_fatal);
        assert_eq!(class.error_type, "RemoteUnavailableError");
    }

    #[test]
    fn test_auth_error_phase_fatal() {
        let err = VulnBridgeError::Authentication("bad token".into());
        let class = err.classify();
        assert!(!class.retryable);
        assert!(class.phase_fatal);
        assert_eq!(class.error_type, "AuthenticationError");
    }

    #[test]
    fn test_safety_policy_never_escalates() {
        let err = VulnBridgeError::SafetyPolicy("module is destructive".into());
        let class = err.classify();
        assert!(!class.retryable);
        assert!(!class.phase_fatal);
        assert_eq!(class.error_type, "SafetyPolicyViolation");
    }

    #[test]
    fn test_malformed_result_recovered_per_record() {
        let err = VulnBridgeError::MalformedResult("missing host".into());
        let class = err.classify();
        assert!(!class.retryable);
        assert!(!class.phase_fatal);
    }

    #[test]
    fn test_config_error_phase_fatal() {
        let err = VulnBridgeError::Config("invalid cadence".into());
        assert!(err.classify().phase_fatal);
    }

    #[test]
    fn test_scan_engine_retryable() {
        let err = VulnBridgeError::ScanEngine("engine 500".into());
        assert!(err.classify().retryable);
    }

    #[test]
    fn test_timeout_retryable() {
        let err = VulnBridgeError::Timeout("poll deadline".into());
        assert!(err.classify().retryable);
    }
}
