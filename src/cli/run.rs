use std::path::Path;

use console::style;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::commands::RunArgs;
use crate::config;
use crate::db::Database;
use crate::errors::VulnBridgeError;
use crate::models::Report;
use crate::pipeline::RunOrchestrator;

pub async fn handle_run(args: RunArgs, quiet: bool) -> Result<(), VulnBridgeError> {
    let config = config::parse_config(Path::new(&args.config)).await?;
    let db = Database::new(&config.database.path)?;

    let cancel_token = CancellationToken::new();
    spawn_ctrl_c_handler(cancel_token.clone());

    let orchestrator = RunOrchestrator::from_config(config, db)
        .await?
        .with_cancel_token(cancel_token);

    let report = orchestrator.run(None).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        print_summary(&report);
    }
    Ok(())
}

fn spawn_ctrl_c_handler(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling in-flight validation");
            cancel_token.cancel();
        }
    });
}

pub fn print_summary(report: &Report) {
    let s = &report.summary;
    println!();
    println!(
        "{} Run {} finished",
        style("✓").green().bold(),
        style(&report.run_id).cyan()
    );
    println!(
        "  {} findings | {} critical | {} high | {} medium | {} low | {} info",
        s.total, s.critical, s.high, s.medium, s.low, s.info
    );
    if s.confirmed > 0 {
        println!(
            "  {} {} confirmed exploitable",
            style("!").red().bold(),
            style(s.confirmed).red().bold()
        );
    }
    if !report.warnings.is_empty() {
        println!(
            "  {} {} warnings (see report for details)",
            style("⚠").yellow(),
            report.warnings.len()
        );
    }
}
