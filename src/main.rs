use anyhow::Result;
use clap::Parser;
use tradein::config::Config;
use tradein::{cli, logging};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file before anything else (silently ignore if missing)
    dotenvy::dotenv().ok();

    let cli_args = cli::Cli::parse();

    // Best-effort read for log settings; real load errors surface in cli::run
    let file_config = match cli_args.config.as_deref() {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .ok();

    let mut log_config = logging::LogConfig::new();
    if let Some(config) = &file_config {
        log_config = log_config.with_level(config.logging.level.clone());
        if let Some(dir) = &config.logging.file {
            log_config = log_config.with_log_dir(dir.clone());
        }
    }
    log_config = log_config.with_debug_mode(cli_args.debug);
    let log_dir = log_config.log_dir.clone();

    let _guard = logging::init_logging(log_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    // Clean up old log files (keep last 7 days)
    if cli_args.debug
        && let Ok(removed) = logging::cleanup_old_logs(&log_dir, 7)
        && removed > 0
    {
        tracing::info!("Cleaned up {} old log file(s)", removed);
    }

    cli::run(cli_args, log_dir).await
}
