use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::VulnBridgeError;

/// Job lifecycle as the remote exploitation service reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteJobState {
    Running,
    Confirmed,
    Inconclusive,
    Failed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteJobStatus {
    pub state: RemoteJobState,
    #[serde(default)]
    pub evidence: String,
}

/// Payload restriction sent with every submission. `verify_only` is always
/// set; validation never delivers a harmful payload.
#[derive(Debug, Clone, Serialize)]
pub struct SafeModeConfig {
    pub verify_only: bool,
    /// Explicitly whitelisted benign payload, when the module needs one.
    pub safe_payload: Option<String>,
}

impl Default for SafeModeConfig {
    fn default() -> Self {
        Self {
            verify_only: true,
            safe_payload: None,
        }
    }
}

/// The remote exploitation service, reduced to the three operations the
/// pipeline needs. No wire protocol is assumed beyond this contract.
#[async_trait]
pub trait ExploitService: Send + Sync {
    async fn submit(
        &self,
        module_id: &str,
        target: &str,
        safe_config: &SafeModeConfig,
    ) -> Result<String, VulnBridgeError>;

    async fn poll(&self, job_id: &str) -> Result<RemoteJobStatus, VulnBridgeError>;

    /// Best-effort cancellation; Ok(false) means the service refused.
    async fn cancel(&self, job_id: &str) -> Result<bool, VulnBridgeError>;
}

/// HTTP JSON implementation against the exploitation framework's RPC API.
pub struct HttpExploitService {
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpExploitService {
    pub fn new(endpoint: &str, token: Option<&str>) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn map_send_error(e: reqwest::Error) -> VulnBridgeError {
        if e.is_connect() || e.is_timeout() {
            VulnBridgeError::RemoteUnavailable(e.to_string())
        } else {
            VulnBridgeError::Network(e.to_string())
        }
    }

    fn check_auth(status: reqwest::StatusCode) -> Result<(), VulnBridgeError> {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(VulnBridgeError::Authentication(format!(
                "Exploitation service rejected credentials (HTTP {})",
                status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ExploitService for HttpExploitService {
    async fn submit(
        &self,
        module_id: &str,
        target: &str,
        safe_config: &SafeModeConfig,
    ) -> Result<String, VulnBridgeError> {
        #[derive(Deserialize)]
        struct SubmitResponse {
            job_id: String,
        }

        let response = self
            .request(self.client.post(format!("{}/jobs", self.endpoint)))
            .json(&serde_json::json!({
                "module": module_id,
                "target": target,
                "safe_mode": safe_config,
            }))
            .send()
            .await
            .map_err(Self::map_send_error)?;

        Self::check_auth(response.status())?;
        if !response.status().is_success() {
            return Err(VulnBridgeError::RemoteUnavailable(format!(
                "Job submission returned HTTP {}",
                response.status()
            )));
        }

        let parsed: SubmitResponse = response
            .json()
            .await
            .map_err(|e| VulnBridgeError::Network(format!("Bad submit response: {}", e)))?;
        Ok(parsed.job_id)
    }

    async fn poll(&self, job_id: &str) -> Result<RemoteJobStatus, VulnBridgeError> {
        let response = self
            .request(self.client.get(format!("{}/jobs/{}", self.endpoint, job_id)))
            .send()
            .await
            .map_err(Self::map_send_error)?;

        Self::check_auth(response.status())?;
        if !response.status().is_success() {
            return Err(VulnBridgeError::RemoteUnavailable(format!(
                "Job poll returned HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| VulnBridgeError::Network(format!("Bad poll response: {}", e)))
    }

    async fn cancel(&self, job_id: &str) -> Result<bool, VulnBridgeError> {
        let response = self
            .request(
                self.client
                    .delete(format!("{}/jobs/{}", self.endpoint, job_id)),
            )
            .send()
            .await
            .map_err(Self::map_send_error)?;

        Self::check_auth(response.status())?;
        Ok(response.status().is_success())
    }
}
