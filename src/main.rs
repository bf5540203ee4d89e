use clap::Parser;
use tracing_subscriber::EnvFilter;

use vulnbridge::cli::{self, Cli, Commands};
use vulnbridge::config;
use vulnbridge::errors::VulnBridgeError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .init();

    let result = match cli.command {
        Commands::Run(args) => cli::run::handle_run(args, cli.quiet).await,
        Commands::Schedule(args) => cli::schedule::handle_schedule(args).await,
        Commands::History(args) => cli::history::handle_history(args).await,
        Commands::Validate(args) => handle_validate(args).await,
    };

    match result {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            let exit_code = match &e {
                VulnBridgeError::Config(_) => 2,
                VulnBridgeError::Catalog(_) => 3,
                VulnBridgeError::Authentication(_) => 4,
                VulnBridgeError::SafetyPolicy(_) => 5,
                _ => 1,
            };
            std::process::exit(exit_code);
        }
    }
}

async fn handle_validate(args: cli::commands::ValidateArgs) -> Result<(), VulnBridgeError> {
    let path = std::path::PathBuf::from(&args.config);
    let _config = config::parse_config(&path).await?;
    println!("Configuration is valid: {}", args.config);
    Ok(())
}
