pub mod normalizer;

pub use normalizer::normalize;

use async_trait::async_trait;

use crate::errors::VulnBridgeError;
use crate::models::EngineTag;

/// Opaque result payload from one scan engine: one JSON record per finding,
/// in the engine's own field vocabulary. Only the engine's normalizer knows
/// the mapping.
pub type RawResults = Vec<serde_json::Value>;

/// One external scan engine. Authentication and session handling against the
/// engine are the adapter's responsibility; the pipeline only sees records.
#[async_trait]
pub trait ScanEngineAdapter: Send + Sync {
    fn tag(&self) -> EngineTag;
    async fn fetch_results(&self, targets: &[String]) -> Result<RawResults, VulnBridgeError>;
}

/// Generic HTTP adapter: POSTs the target set to the engine's result
/// endpoint and expects a JSON array of engine-native records back.
pub struct HttpScanEngine {
    tag: EngineTag,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpScanEngine {
    pub fn new(tag: EngineTag, endpoint: &str) -> Self {
        Self {
            tag,
            endpoint: endpoint.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ScanEngineAdapter for HttpScanEngine {
    fn tag(&self) -> EngineTag {
        self.tag
    }

    async fn fetch_results(&self, targets: &[String]) -> Result<RawResults, VulnBridgeError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "targets": targets }))
            .send()
            .await
            .map_err(|e| {
                VulnBridgeError::ScanEngine(format!("{} fetch failed: {}", self.tag, e))
            })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(VulnBridgeError::Authentication(format!(
                "{} rejected credentials",
                self.tag
            )));
        }
        if !response.status().is_success() {
            return Err(VulnBridgeError::ScanEngine(format!(
                "{} returned HTTP {}",
                self.tag,
                response.status()
            )));
        }

        let records: RawResults = response.json().await.map_err(|e| {
            VulnBridgeError::ScanEngine(format!("{} returned non-JSON results: {}", self.tag, e))
        })?;
        Ok(records)
    }
}
