use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use courtside::config::Config;

#[derive(Parser)]
#[command(
    name = "courtside",
    version,
    about = "Sports-venue slot reservation for the campus booking portal",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the reservation API
    Serve {
        /// TOML configuration file (environment variables otherwise)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run one reservation in the foreground
    Book {
        /// Student/staff id used to log in
        #[arg(long)]
        user_id: String,

        /// Display name on the booking
        #[arg(long)]
        name: String,

        /// Login password
        #[arg(long, env = "COURTSIDE_PASSWORD", hide_env_values = true)]
        password: String,

        /// Phone number for the confirmation
        #[arg(long, default_value = "")]
        phone: String,

        /// Date to book (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// First start time (HH:MM)
        #[arg(long)]
        first: String,

        /// Second start time (HH:MM, omit or 00:00 for none)
        #[arg(long)]
        second: Option<String>,

        /// Start immediately instead of waiting for the daily trigger
        #[arg(long, default_value = "false")]
        now: bool,

        /// TOML configuration file (environment variables otherwise)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.command {
        Commands::Serve { config } | Commands::Book { config, .. } => config.clone(),
    };
    let config = load_config(config_path.as_deref())?;

    // Initialize tracing/logging
    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    match cli.command {
        Commands::Serve { .. } => {
            tracing::info!(host = %config.server.host, port = config.server.port, "Starting serve command");
            commands::serve(config).await?;
        }

        Commands::Book {
            user_id,
            name,
            password,
            phone,
            date,
            first,
            second,
            now,
            ..
        } => {
            tracing::info!(user_id = %user_id, date = %date, first = %first, second = ?second, now, "Starting book command");
            commands::book(
                config,
                commands::BookParams {
                    user_id,
                    name,
                    password,
                    phone,
                    date,
                    first,
                    second,
                    now,
                },
            )
            .await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("courtside=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(format!("courtside={level},warn"))
        })
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}
