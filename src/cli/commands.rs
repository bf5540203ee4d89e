use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vulnbridge", version, about = "Scanner correlation and safe exploit validation pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute one pipeline run and print the summary
    Run(RunArgs),
    /// Run the pipeline on a recurring cadence until interrupted
    Schedule(ScheduleArgs),
    /// List past runs or show one run's stored report
    History(HistoryArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct RunArgs {
    /// YAML configuration file
    #[arg(short, long, default_value = "./vulnbridge.yaml")]
    pub config: String,

    /// Print the full report as JSON instead of the summary table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct ScheduleArgs {
    /// YAML configuration file
    #[arg(short, long, default_value = "./vulnbridge.yaml")]
    pub config: String,

    /// Schedule identifier recorded against each run
    #[arg(long, default_value = "default")]
    pub id: String,

    /// Cadence override: plain seconds ("3600") or whole days ("7d")
    #[arg(long)]
    pub cadence: Option<String>,
}

#[derive(Args, Clone)]
pub struct HistoryArgs {
    /// YAML configuration file
    #[arg(short, long, default_value = "./vulnbridge.yaml")]
    pub config: String,

    /// Show the stored report for one run instead of the run list
    pub run_id: Option<String>,

    /// Maximum number of runs to list
    #[arg(long, default_value = "20")]
    pub limit: usize,

    /// Number of runs to skip
    #[arg(long, default_value = "0")]
    pub offset: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
