use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use super::formatter::format_report_markdown;
use crate::errors::VulnBridgeError;
use crate::models::Report;

/// Destination for finished run reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn publish(&self, report: &Report) -> Result<(), VulnBridgeError>;
}

/// Writes `report.json` and `summary.md` into a per-run directory.
pub struct FileReportSink {
    directory: PathBuf,
}

impl FileReportSink {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    fn run_dir(&self, report: &Report) -> PathBuf {
        self.directory.join(&report.run_id)
    }
}

#[async_trait]
impl ReportSink for FileReportSink {
    async fn publish(&self, report: &Report) -> Result<(), VulnBridgeError> {
        let dir = self.run_dir(report);
        tokio::fs::create_dir_all(&dir).await?;

        let json = serde_json::to_string_pretty(report)?;
        tokio::fs::write(dir.join("report.json"), json).await?;

        let markdown = format_report_markdown(report);
        tokio::fs::write(dir.join("summary.md"), markdown).await?;

        info!(run_id = %report.run_id, path = %dir.display(), "Report published");
        Ok(())
    }
}
