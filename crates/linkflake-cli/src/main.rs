#![doc = include_str!("../README.md")]

mod cli;

use std::io::{self, BufWriter, Write};

use clap::Parser;
use cli::config::{AppConfig, CliArgs};
use cli::telemetry::init_telemetry;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = AppConfig::try_from(args)?;

    init_telemetry()?;
    tracing::debug!("starting with config: {:#?}", config);

    let mut out = BufWriter::new(io::stdout().lock());
    cli::commands::run(&config, &mut out)?;
    out.flush()?;
    Ok(())
}
