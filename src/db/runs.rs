use chrono::Utc;

use super::Database;
use crate::errors::VulnBridgeError;
use crate::models::Report;

impl Database {
    pub fn create_run(&self, id: &str, schedule_id: Option<&str>) -> Result<(), VulnBridgeError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO runs (id, schedule_id, status, created_at) VALUES (?1, ?2, 'queued', ?3)",
            rusqlite::params![id, schedule_id, Utc::now().to_rfc3339()],
        )
        .map_err(|e| VulnBridgeError::Database(format!("Failed to create run: {}", e)))?;
        Ok(())
    }

    pub fn update_run_status(&self, id: &str, status: &str) -> Result<(), VulnBridgeError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        match status {
            "running" => {
                conn.execute(
                    "UPDATE runs SET status = ?2, started_at = ?3 WHERE id = ?1",
                    rusqlite::params![id, status, now],
                )
                .map_err(|e| VulnBridgeError::Database(format!("Update failed: {}", e)))?;
            }
            "completed" | "failed" => {
                conn.execute(
                    "UPDATE runs SET status = ?2, completed_at = ?3 WHERE id = ?1",
                    rusqlite::params![id, status, now],
                )
                .map_err(|e| VulnBridgeError::Database(format!("Update failed: {}", e)))?;
            }
            _ => {
                conn.execute(
                    "UPDATE runs SET status = ?2 WHERE id = ?1",
                    rusqlite::params![id, status],
                )
                .map_err(|e| VulnBridgeError::Database(format!("Update failed: {}", e)))?;
            }
        }
        Ok(())
    }

    /// Record a finished run with its report and counters.
    pub fn finish_run(&self, report: &Report) -> Result<(), VulnBridgeError> {
        let json = serde_json::to_string(report)?;
        let candidate_count: usize = report.entries.iter().map(|e| e.candidates.len()).sum();
        let outcome_count: usize = report.entries.iter().map(|e| e.outcomes.len()).sum();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE runs SET status = 'completed', finding_count = ?2, candidate_count = ?3, \
             outcome_count = ?4, confirmed_count = ?5, warning_count = ?6, report_json = ?7, \
             completed_at = ?8 WHERE id = ?1",
            rusqlite::params![
                report.run_id,
                report.summary.total as i64,
                candidate_count as i64,
                outcome_count as i64,
                report.summary.confirmed as i64,
                report.warnings.len() as i64,
                json,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| VulnBridgeError::Database(format!("Failed to finish run: {}", e)))?;
        Ok(())
    }

    pub fn get_run(&self, id: &str) -> Result<Option<serde_json::Value>, VulnBridgeError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, schedule_id, status, finding_count, candidate_count, outcome_count, \
                 confirmed_count, warning_count, error_message, created_at, started_at, \
                 completed_at FROM runs WHERE id = ?1",
            )
            .map_err(|e| VulnBridgeError::Database(format!("Query failed: {}", e)))?;

        let result = stmt.query_row(rusqlite::params![id], |row: &rusqlite::Row| {
            Ok(serde_json::json!({
                "id": row.get::<_, String>(0)?,
                "schedule_id": row.get::<_, Option<String>>(1)?,
                "status": row.get::<_, String>(2)?,
                "finding_count": row.get::<_, i64>(3)?,
                "candidate_count": row.get::<_, i64>(4)?,
                "outcome_count": row.get::<_, i64>(5)?,
                "confirmed_count": row.get::<_, i64>(6)?,
                "warning_count": row.get::<_, i64>(7)?,
                "error": row.get::<_, Option<String>>(8)?,
                "created_at": row.get::<_, String>(9)?,
                "started_at": row.get::<_, Option<String>>(10)?,
                "completed_at": row.get::<_, Option<String>>(11)?,
            }))
        });

        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(VulnBridgeError::Database(format!("Query error: {}", e))),
        }
    }

    pub fn get_run_report(&self, id: &str) -> Result<Option<Report>, VulnBridgeError> {
        let conn = self.conn.lock().unwrap();
        let result: Result<Option<String>, _> = conn.query_row(
            "SELECT report_json FROM runs WHERE id = ?1",
            rusqlite::params![id],
            |row| row.get(0),
        );
        match result {
            Ok(Some(json)) => Ok(Some(serde_json::from_str(&json)?)),
            Ok(None) => Ok(None),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(VulnBridgeError::Database(format!("Query error: {}", e))),
        }
    }

    pub fn list_runs(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<serde_json::Value>, VulnBridgeError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, schedule_id, status, finding_count, confirmed_count, created_at, \
                 completed_at FROM runs ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
            )
            .map_err(|e| VulnBridgeError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt
            .query_map(
                rusqlite::params![limit as i64, offset as i64],
                |row: &rusqlite::Row| {
                    Ok(serde_json::json!({
                        "id": row.get::<_, String>(0)?,
                        "schedule_id": row.get::<_, Option<String>>(1)?,
                        "status": row.get::<_, String>(2)?,
                        "finding_count": row.get::<_, i64>(3)?,
                        "confirmed_count": row.get::<_, i64>(4)?,
                        "created_at": row.get::<_, String>(5)?,
                        "completed_at": row.get::<_, Option<String>>(6)?,
                    }))
                },
            )
            .map_err(|e| VulnBridgeError::Database(format!("Query error: {}", e)))?;

        let mut results: Vec<serde_json::Value> = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| VulnBridgeError::Database(format!("Row error: {}", e)))?);
        }
        Ok(results)
    }

    pub fn mark_run_failed(&self, id: &str, error: &str) -> Result<(), VulnBridgeError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE runs SET status = 'failed', error_message = ?2, completed_at = ?3 WHERE id = ?1",
            rusqlite::params![id, error, Utc::now().to_rfc3339()],
        )
        .map_err(|e| VulnBridgeError::Database(format!("Update failed: {}", e)))?;
        Ok(())
    }
}
