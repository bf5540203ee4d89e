use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::commands::ScheduleArgs;
use crate::config::{self, parse_cadence};
use crate::db::Database;
use crate::errors::VulnBridgeError;
use crate::pipeline::RunOrchestrator;
use crate::scheduler::Scheduler;

pub async fn handle_schedule(args: ScheduleArgs) -> Result<(), VulnBridgeError> {
    let config = config::parse_config(Path::new(&args.config)).await?;

    // CLI cadence wins over the config file's.
    let cadence = match &args.cadence {
        Some(expr) => parse_cadence(expr)?,
        None => config
            .schedule
            .cadence_duration()?
            .ok_or_else(|| VulnBridgeError::Config("No cadence configured; set schedule.cadence or pass --cadence".into()))?,
    };

    let db = Database::new(&config.database.path)?;
    let cancel_token = CancellationToken::new();
    let orchestrator = RunOrchestrator::from_config(config, db)
        .await?
        .with_cancel_token(cancel_token.clone());

    let scheduler = Scheduler::new(Arc::new(orchestrator));
    scheduler.schedule_recurring(&args.id, cadence)?;
    info!(
        schedule_id = %args.id,
        cadence_secs = cadence.as_secs(),
        "Scheduler running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down scheduler");
    cancel_token.cancel();
    scheduler.shutdown().await;
    Ok(())
}
