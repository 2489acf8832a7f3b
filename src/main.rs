use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use dms_logoplot::cli::Args;
use dms_logoplot::config::PlotConfig;
use dms_logoplot::logging;
use dms_logoplot::pipeline;

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let config = PlotConfig::from_args(&args)?;
    let renderer = config.format.renderer();

    if let Some(existing) = pipeline::existing_plot(&config, renderer.as_ref()) {
        println!("{} already exists; nothing to do", existing.display());
        return Ok(ExitCode::SUCCESS);
    }

    std::fs::create_dir_all(&config.outdir)
        .with_context(|| format!("creating output directory {}", config.outdir.display()))?;
    logging::init(&config.log_path())?;

    info!("dms2_logoplot {}", env!("CARGO_PKG_VERSION"));
    info!("arguments: {:?}", std::env::args().skip(1).collect::<Vec<_>>());

    match pipeline::run(&config, renderer.as_ref()) {
        Ok(path) => {
            info!("successfully created {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("terminating with error: {e:#}");
            Ok(ExitCode::FAILURE)
        }
    }
}
