//! pprsolver CLI entry point.

use anyhow::{Context, Result};
use pprsolver::config::cli::Cli;
use pprsolver::config::RunConfig;
use pprsolver::pipeline;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    let config = RunConfig::from_cli(cli).context("invalid arguments")?;

    let report = pipeline::run(&config);
    let report = match report {
        Ok(r) => r,
        Err(pprsolver::SolverError::EmptyDataset) => {
            eprintln!("dataset is empty: no valid (Normal or Zero) IEEE values in file");
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("pipeline run failed"),
    };

    if config.json_output {
        println!("{}", report.render_json().context("rendering JSON report")?);
    } else {
        print!("{}", report.render_text());
    }

    Ok(())
}
