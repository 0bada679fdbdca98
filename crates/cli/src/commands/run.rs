//! Suite execution command

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use pushengage_e2e::{report, Playwright, SuiteFile, SuiteFilter, TestRunner};
use tracing::info;

use super::{load_config, EnvArgs};
use crate::output::{print_error, print_run_summary, print_warning, OutputFormat};

const PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Suite config (config/wordpress.yaml or config/saas.yaml)
    #[arg(short, long, default_value = "config/wordpress.yaml")]
    pub config: PathBuf,

    /// Directory holding `*.spec.yaml` suite files
    #[arg(short, long, default_value = "tests/suite")]
    pub suites: PathBuf,

    /// Only suites of this priority tier
    #[arg(long)]
    pub priority: Option<String>,

    /// Only suites of this feature
    #[arg(long)]
    pub feature: Option<String>,

    /// Only this suite, or only this test
    #[arg(short, long)]
    pub name: Option<String>,

    #[command(flatten)]
    pub env: EnvArgs,
}

/// Returns whether every selected test passed (flaky counts as passed)
pub async fn execute(args: RunArgs, format: OutputFormat) -> Result<bool> {
    let config = load_config(&args.config, &args.env)?;

    let filter = SuiteFilter {
        app: Some(config.app),
        priority: args.priority,
        feature: args.feature,
        name: args.name.clone(),
    };
    let loaded = SuiteFile::load_all(&args.suites)
        .with_context(|| format!("Failed to load suites from {}", args.suites.display()))?;
    let mut suites = filter.apply(loaded);

    if let Some(name) = &args.name {
        for suite in suites.iter_mut().filter(|s| s.name != *name) {
            suite.tests.retain(|t| t.name == *name);
        }
    }

    if suites.is_empty() {
        print_warning(&format!(
            "No {} suites matched under {}",
            config.app.as_str(),
            args.suites.display()
        ));
        return Ok(true);
    }

    let factory = Arc::new(Playwright::new(config.playwright_config())?);
    let runner = TestRunner::new(config.clone(), factory);
    let suites = runner.select(suites)?;

    if config.preflight {
        runner.preflight(PREFLIGHT_TIMEOUT).await?;
    }

    info!("Testing {} at {}", config.app.as_str(), config.base_url);
    let results = runner.run_suites(&suites).await?;

    let written = report::write_reports(&results, &config.reporters, &config.output_dir)?;
    for path in written {
        info!("Report: {}", path.display());
    }

    print_run_summary(&results, format);
    if !results.success() {
        print_error(&format!("{} test(s) failed", results.failed));
    }
    Ok(results.success())
}
