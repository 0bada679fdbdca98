//! Scaffold generation command

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::generator::{self, TestPlan};
use crate::output::{print_generation_summary, print_success, OutputFormat};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Test plan (priority → feature → descriptors)
    #[arg(long, default_value = "test-plan.yaml")]
    pub table: PathBuf,

    /// Suite root the scaffolds are written under
    #[arg(long, default_value = "tests/suite")]
    pub out: PathBuf,
}

pub async fn execute(args: GenerateArgs, format: OutputFormat) -> Result<()> {
    let plan = TestPlan::from_file(&args.table)?;
    let report = generator::generate(&plan, &args.out)?;

    print_generation_summary(&report, format);
    if report.remaining == 0 {
        print_success("Every planned test is implemented");
    }
    Ok(())
}
