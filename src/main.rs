mod app;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use app::{cli::Cli, config::setup};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup::init(cli.log_level())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()?;

    runtime.block_on(app::run(cli))
}
