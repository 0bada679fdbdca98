//! pe-suite - PushEngage regression suite CLI
//!
//! Runs the browser suites against the WordPress plugin or the dashboard,
//! manages the saved dashboard session and scaffolds planned tests.

use clap::{Parser, Subcommand};

use pushengage_cli::commands::{generate, run, session};
use pushengage_cli::output;

/// PushEngage browser regression suite
#[derive(Parser)]
#[command(name = "pe-suite")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run suite files against the configured app
    Run(run::RunArgs),

    /// Scaffold suite files and READMEs from a test plan
    Generate(generate::GenerateArgs),

    /// Capture or clear the saved dashboard session
    #[command(subcommand)]
    Session(session::SessionCommands),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => {
            if !run::execute(args, cli.format).await? {
                std::process::exit(1);
            }
        }
        Commands::Generate(args) => generate::execute(args, cli.format).await?,
        Commands::Session(cmd) => session::execute(cmd).await?,
    }

    Ok(())
}
