//! Storage-state session commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use pushengage_e2e::auth::LoginOutcome;
use pushengage_e2e::{Playwright, SessionStore, SuiteConfig};

use super::{load_config, EnvArgs};
use crate::output::{print_info, print_success};

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Log in through a visible browser and save the storage state
    Capture(SessionArgs),

    /// Delete the saved storage state (logout)
    Clear(SessionArgs),
}

#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Suite config naming the storage state file
    #[arg(short, long, default_value = "config/saas.yaml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub env: EnvArgs,
}

pub async fn execute(cmd: SessionCommands) -> Result<()> {
    match cmd {
        SessionCommands::Capture(args) => capture(args).await,
        SessionCommands::Clear(args) => clear(args).await,
    }
}

fn store_for(config: &SuiteConfig) -> Result<SessionStore> {
    let path = config
        .storage_state
        .clone()
        .context("Config has no storage_state path")?;
    Ok(SessionStore::new(path))
}

async fn capture(args: SessionArgs) -> Result<()> {
    let config = load_config(&args.config, &args.env)?;
    let store = store_for(&config)?;
    let factory = Playwright::new(config.playwright_config())?;

    if !config.credentials.is_complete() {
        print_info("No credentials configured; log in manually in the browser window");
    }
    let outcome = store
        .capture(
            &factory,
            &config.base_url,
            &config.credentials,
            &config.login_form(),
            &config.timeouts(),
        )
        .await?;

    if outcome == LoginOutcome::AlreadyAuthenticated {
        print_info("Browser was already authenticated");
    }
    print_success(&format!("Storage state saved to {}", store.path().display()));
    Ok(())
}

async fn clear(args: SessionArgs) -> Result<()> {
    let config = load_config(&args.config, &args.env)?;
    let store = store_for(&config)?;

    if store.clear().await? {
        print_success(&format!("Removed {}", store.path().display()));
    } else {
        print_info(&format!("No storage state at {}", store.path().display()));
    }
    Ok(())
}
