use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use teamup_calendar::{TeamupError, TeamupService, TemplateTag};
use teamup_core::{Config, ConfigError, DatabaseError, NetworkError};

/// Weekly Teamup schedule, rendered as HTML for the `[teamup]` template tag.
#[derive(Parser)]
#[command(name = "teamup", version = env!("CARGO_PKG_VERSION"), long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default location
    #[arg(global = true, long = "config")]
    config: Option<PathBuf>,

    /// Override the schedule database path
    #[arg(global = true, long = "db")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the HTML for a template tag
    Render {
        /// Render a single event by reference (e.g. "42-20240101T090000Z")
        #[arg(long, conflicts_with = "shortcode")]
        event: Option<String>,

        /// Shortcode text such as '[teamup event="42-x"]'; defaults to `[teamup]`
        shortcode: Option<String>,
    },

    /// Refetch the current week now, ignoring the freshness marker
    Refresh,

    /// Create the tables and run the schema version check
    Activate,

    /// Drop the events table and all stored options
    Uninstall,

    /// Print the cached events as JSON
    List,

    /// Validate the configuration file
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = teamup_core::init() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Command failed");
            eprintln!("Error: {}", user_message(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = cli.db {
        config.storage.database_path = db;
    }

    if let Commands::CheckConfig = cli.command {
        return check_config(&config);
    }

    let validation = config.validate();
    if !validation.is_valid() {
        return Err(ConfigError::Invalid(validation.error_summary()).into());
    }
    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }

    let service = TeamupService::open(&config)?;

    match cli.command {
        Commands::Render { event, shortcode } => {
            let tag = match (event, shortcode) {
                (Some(event_ref), _) => TemplateTag::EventView { event_ref },
                (None, Some(text)) => TemplateTag::parse(&text)?,
                (None, None) => TemplateTag::CalendarView,
            };
            println!("{}", service.handle(&tag).await);
        }
        Commands::Refresh => {
            let fetched = service.refresh_now().await?;
            let stored = service.renderer().cache().store().count()?;
            tracing::debug!(fetched, stored, "Manual refresh finished");
            println!("Stored {} weekly events", stored);
        }
        Commands::Activate => {
            println!(
                "Schedule database ready at {}",
                config.storage.database_path.display()
            );
        }
        Commands::Uninstall => {
            service.uninstall()?;
            println!("Removed schedule table and options");
        }
        Commands::List => {
            let events = service.events().await?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        Commands::CheckConfig => {}
    }

    Ok(())
}

fn check_config(config: &Config) -> Result<()> {
    let validation = config.validate();

    for warning in &validation.warnings {
        println!("warning: {}", warning);
    }
    for error in &validation.errors {
        println!("error: {}", error);
    }

    if validation.is_valid() {
        println!("Configuration OK");
        Ok(())
    } else {
        Err(ConfigError::Invalid(validation.error_summary()).into())
    }
}

/// Best user-facing message for an error bubbling out of a command.
fn user_message(error: &anyhow::Error) -> String {
    if let Some(e) = error.downcast_ref::<TeamupError>() {
        return e.user_message();
    }
    if let Some(e) = error.downcast_ref::<ConfigError>() {
        return format!("{} ({})", e.user_message(), e);
    }
    if let Some(e) = error.downcast_ref::<DatabaseError>() {
        return e.user_message().to_string();
    }
    if let Some(e) = error.downcast_ref::<NetworkError>() {
        return e.user_message().to_string();
    }
    error.to_string()
}
