pub mod cli;
pub mod config;
pub mod models;

use std::{process::ExitCode, sync::Arc};

use anyhow::Result;
use core_clipstitch::services::stitch::StitchService;
use tracing::info;

use cli::Cli;
use config::info::{APP_NAME, VERSION};
use models::JobSummary;

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let settings = cli.settings()?;
    if cli.print_config {
        print!("{}", settings.to_toml()?);
        return Ok(ExitCode::SUCCESS);
    }

    info!(
        "{APP_NAME} {VERSION}: {} with profile {} at {} fps",
        cli.root.display(),
        settings.profile,
        settings.target_fps,
    );

    let report = StitchService::run_root(&cli.root, Arc::new(settings), &cli.only).await?;

    for entry in &report.entries {
        println!("{}", JobSummary::from(entry));
    }
    println!(
        "{} stitched, {} skipped, {} failed",
        report.stitched(),
        report.skipped(),
        report.failed(),
    );

    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
