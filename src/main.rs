mod config;

use clap::Parser;
use config::{Args, OutputFormat, WalkConfig};
use eyre::WrapErr;
use pathkit::{FsPath, Walker};
use serde::Serialize;
use std::io::{self, Write};

use tracing::{debug, Level};
use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Serialize, Debug)]
struct WalkReport<'a> {
    root: &'a FsPath,
    paths: Vec<FsPath>,
}

fn main() -> Result<(), eyre::Report> {
    dotenv::dotenv().ok();
    color_eyre::install()?;

    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_line_number(true)
        .with_env_filter(EnvFilter::try_new(&args.log).wrap_err("Invalid log filter")?)
        .with_writer(io::stderr)
        .finish()
        .with(ErrorLayer::default());

    tracing::subscriber::set_global_default(subscriber)?;

    let config = WalkConfig::try_from(&args)?;
    debug!(?config, "starting walk");

    let policy = config.policy()?;
    let walker = Walker::new(config.root()).sorted(config.sorted());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match config.output() {
        OutputFormat::Lines => {
            walker.try_visit(&policy, |path| writeln!(out, "{}", path))?;
        }
        OutputFormat::Json => {
            let report = WalkReport {
                root: config.root(),
                paths: walker.collect(&policy),
            };
            serde_json::to_writer_pretty(&mut out, &report)
                .wrap_err("Failed to write walk report")?;
            writeln!(out)?;
        }
    }
    out.flush()?;

    Ok(())
}
