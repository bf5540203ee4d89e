use std::path::Path;

use console::style;

use crate::cli::commands::HistoryArgs;
use crate::config;
use crate::db::Database;
use crate::errors::VulnBridgeError;

pub async fn handle_history(args: HistoryArgs) -> Result<(), VulnBridgeError> {
    let config = config::parse_config(Path::new(&args.config)).await?;
    let db = Database::new(&config.database.path)?;

    match &args.run_id {
        Some(run_id) => show_run(&db, run_id, args.json),
        None => list_runs(&db, args.limit, args.offset, args.json),
    }
}

fn show_run(db: &Database, run_id: &str, json: bool) -> Result<(), VulnBridgeError> {
    let report = db
        .get_run_report(run_id)?
        .ok_or_else(|| VulnBridgeError::Database(format!("No stored report for run {}", run_id)))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        super::run::print_summary(&report);
    }
    Ok(())
}

fn list_runs(db: &Database, limit: usize, offset: usize, json: bool) -> Result<(), VulnBridgeError> {
    let runs = db.list_runs(limit, offset)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("No runs recorded.");
        return Ok(());
    }

    for run in &runs {
        let status = run["status"].as_str().unwrap_or("unknown");
        let styled_status = match status {
            "completed" => style(status).green(),
            "failed" => style(status).red(),
            _ => style(status).yellow(),
        };
        println!(
            "{}  {}  findings={} confirmed={}  {}",
            run["created_at"].as_str().unwrap_or("-"),
            styled_status,
            run["finding_count"].as_i64().unwrap_or(0),
            run["confirmed_count"].as_i64().unwrap_or(0),
            style(run["id"].as_str().unwrap_or("-")).cyan(),
        );
    }
    Ok(())
}
