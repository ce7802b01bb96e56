//! CLI Module
//!
//! Command-line host for the trade-in wizard using Clap v4.

pub mod commands;
pub mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::app::{WizardRuntime, WizardUpdate};
use crate::catalog::{CatalogService, VehicleDataClient};
use crate::config::Config;
use crate::valuation::ValuationPipeline;
use commands::{HELP, HostCommand, parse_line};

/// Trade-in wizard: resolve a vehicle, collect contact details, submit a valuation
#[derive(Parser, Debug)]
#[command(name = "tradein")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug mode (writes log files to .tradein/logs/)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the interactive wizard (default)
    Run,

    /// List model years from the catalog
    Years,

    /// List makes for a year
    Makes {
        year: String,
    },

    /// List models for a year and make
    Models {
        year: String,
        make: String,
    },

    /// Write a default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration
    Config {
        /// Show the auth key
        #[arg(short, long)]
        show_secrets: bool,
    },

    /// Log management operations
    Logs {
        #[command(subcommand)]
        operation: LogCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// Show log directory location
    Status,
    /// Clean up old log files
    Clean {
        /// Maximum age in days (default: 7)
        #[arg(short = 'a', long, default_value = "7")]
        days: u64,
    },
}

/// Main CLI entry point
pub async fn run(cli: Cli, log_dir: PathBuf) -> Result<()> {
    if cli.debug {
        tracing::info!("Debug mode enabled");
    }

    match cli.command {
        None | Some(Commands::Run) => {
            let config = load_config(cli.config.as_deref(), true)?;
            cmd_run(&config).await
        }
        Some(Commands::Years) => {
            let config = load_config(cli.config.as_deref(), false)?;
            let client = VehicleDataClient::from_config(&config)?;
            print_list(client.list_years().await?);
            Ok(())
        }
        Some(Commands::Makes { year }) => {
            let config = load_config(cli.config.as_deref(), false)?;
            let client = VehicleDataClient::from_config(&config)?;
            print_list(client.list_makes(&year).await?);
            Ok(())
        }
        Some(Commands::Models { year, make }) => {
            let config = load_config(cli.config.as_deref(), false)?;
            let client = VehicleDataClient::from_config(&config)?;
            print_list(client.list_models(&year, &make).await?);
            Ok(())
        }
        Some(Commands::Init { force }) => cmd_init(force),
        Some(Commands::Config { show_secrets }) => {
            let config = load_config(cli.config.as_deref(), false)?;
            cmd_config(&config, show_secrets)
        }
        Some(Commands::Logs { operation }) => cmd_logs(operation, &log_dir),
    }
}

/// Load configuration from file or defaults.
/// Catalog-only commands do not need a sink, so full validation is optional.
fn load_config(config_path: Option<&str>, validate: bool) -> Result<Config> {
    let config = if let Some(path) = config_path {
        tracing::info!("Loading configuration from custom path: {}", path);
        Config::load_from_path(path)?
    } else {
        tracing::debug!("Loading default configuration");
        Config::load()?
    };

    if validate {
        config.validate()?;
    }

    Ok(config)
}

fn print_list(values: Vec<String>) {
    for value in values {
        println!("{}", value);
    }
}

/// Drive the wizard from stdin until redirect or quit
async fn cmd_run(config: &Config) -> Result<()> {
    let client = VehicleDataClient::from_config(config)?;
    let pipeline = Arc::new(ValuationPipeline::from_config(config, client.clone())?);
    let (runtime, handle, mut updates) = WizardRuntime::new(client, pipeline);
    let wizard = tokio::spawn(runtime.run());

    println!("{}\n", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_view = None;

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(WizardUpdate::View(view)) => {
                    if last_view.as_ref() != Some(&view) {
                        println!("{}\n", ui::render_view(&view));
                        last_view = Some(view);
                    }
                }
                Some(WizardUpdate::Redirect(_)) | None => break,
            },
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        handle.quit();
                        break;
                    }
                    Err(e) => {
                        handle.quit();
                        return Err(e).context("Failed to read stdin");
                    }
                };
                match parse_line(&line) {
                    Ok(HostCommand::Set { field, value }) => {
                        handle.set_field(field, value);
                    }
                    Ok(HostCommand::Next) => {
                        handle.advance();
                    }
                    Ok(HostCommand::Back) => {
                        handle.back();
                    }
                    Ok(HostCommand::Attr(metadata)) => {
                        handle.attribution(metadata);
                        println!("Attribution updated");
                    }
                    Ok(HostCommand::Show) => {
                        last_view = None;
                        handle.refresh();
                    }
                    Ok(HostCommand::Help) => println!("{}", HELP),
                    Ok(HostCommand::Quit) => {
                        handle.quit();
                        break;
                    }
                    Err(commands::CommandError::Empty) => {}
                    Err(e) => println!("{}", e),
                }
            }
        }
    }

    // A submission already issued settles before the runtime returns
    if let Some(target) = wizard.await.context("Wizard task failed")? {
        println!("Submitted. Open at the top level:\n  {}", target);
    }
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("tradein")
        .join("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at: {}\nUse --force to overwrite",
            config_path.display()
        );
    }

    Config::default().save(&config_path)?;

    println!("Configuration initialized at: {}", config_path.display());
    println!("Next: set services.auth_key and submission.sink_url (or TRADEIN_AUTH_KEY / TRADEIN_WEBHOOK_URL)");

    Ok(())
}

fn cmd_config(config: &Config, show_secrets: bool) -> Result<()> {
    println!("Services:   {}", config.services.base_url);
    let key = if show_secrets {
        config.services.auth_key.expose_secret().to_string()
    } else if config.services.auth_key.is_empty() {
        "[NOT SET]".to_string()
    } else {
        "[SET]".to_string()
    };
    println!("Auth key:   {}", key);
    println!(
        "Sink:       {}",
        config.submission.sink_url.as_deref().unwrap_or("[NOT SET]")
    );
    println!("Redirect:   {}", config.submission.redirect_base_url);
    println!(
        "HTTP:       timeout {}s, connect {}s",
        config.http.timeout_secs, config.http.connect_timeout_secs
    );
    println!("Log level:  {}", config.logging.level);
    Ok(())
}

fn cmd_logs(operation: LogCommands, log_dir: &std::path::Path) -> Result<()> {
    match operation {
        LogCommands::Status => {
            println!("Log directory: {}", log_dir.display());
            println!(
                "Exists: {}",
                if log_dir.exists() { "yes" } else { "no (run with --debug)" }
            );
        }
        LogCommands::Clean { days } => {
            let removed = crate::logging::cleanup_old_logs(log_dir, days)?;
            println!("Removed {} log file(s) older than {} day(s)", removed, days);
        }
    }
    Ok(())
}
