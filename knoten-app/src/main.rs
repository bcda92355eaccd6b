use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use knoten_common::observability::{LogConfig, LogFormat, init_logging};
use knoten_config::{KnotenConfig, KnotenConfigLoader, LogFormatName};
use knoten_core::{NodelistV1, Runner};

/// Directory layout served by the community's map backend. Switch to
/// `knoten_core::MeshviewerV2` for meshviewer `nodes.json` deployments.
type TargetSchema = NodelistV1;

#[derive(Parser)]
#[command(name = "knotenalarm", version, about = "Announce new Freifunk nodes")]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, env = "KNOTEN_CONFIG", default_value = "knotenalarm.yaml")]
    config: PathBuf,

    /// Print announcements to stdout instead of posting them
    #[arg(long)]
    debug: bool,

    /// Only announce nodes first seen within this many minutes
    #[arg(long)]
    lookback_minutes: Option<u32>,
}

fn load_config(cli: &Cli) -> Result<KnotenConfig> {
    let mut loader = KnotenConfigLoader::new().with_file(&cli.config);
    if cli.debug {
        loader = loader.with_override("settings.debug", true)?;
    }
    if let Some(minutes) = cli.lookback_minutes {
        loader = loader.with_override("settings.lookback_minutes", i64::from(minutes))?;
    }
    loader
        .load()
        .with_context(|| format!("loading {}", cli.config.display()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Config: file, then KNOTEN__* env, then CLI flags
    let cfg = load_config(&cli)?;

    // 2) Logging as configured
    let log_path = init_logging(LogConfig {
        app_name: "knotenalarm",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: match cfg.logging.format {
            LogFormatName::Text => LogFormat::Text,
            LogFormatName::Json => LogFormat::Json,
        },
        default_filter: cfg.logging.filter.clone(),
    })?;
    tracing::info!(
        log = %log_path.display(),
        debug = cfg.settings.debug,
        lookback_minutes = cfg.settings.lookback_minutes,
        "knotenalarm.start"
    );

    // 3) One run
    let mut runner = Runner::<TargetSchema>::from_config(&cfg)?;
    match runner.run(chrono::Utc::now()).await {
        Ok(report) => {
            tracing::info!(
                cutoff = %report.cutoff,
                fetched = report.fetched,
                announced = report.announcements.len(),
                "knotenalarm.finished"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                phase = ?runner.phase(),
                kind = e.kind(),
                error = %e,
                "knotenalarm.failed"
            );
            Err(e.into())
        }
    }
}
