mod migrate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use productdb_config::{DatabaseConfig, EnvLoader};
use tracing::info;
use productdb_db::Catalog;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "productdb-migrate",
    version,
    about = "Apply and inspect productdb schema migrations"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations, or show their status with --status
    Run {
        /// Apply only this version
        #[arg(value_name = "VERSION")]
        target: Option<String>,

        /// Show which migrations are applied without changing anything
        #[arg(long, conflicts_with = "target")]
        status: bool,

        /// Print the status as JSON instead of a table
        #[arg(long, requires = "status")]
        json: bool,
    },

    /// List the migrations shipped with this build
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Before the subscriber, so RUST_LOG can come from .env.
    let dotenv = EnvLoader::load_dotenv()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = dotenv {
        info!("loaded environment from {}", path.display());
    }
    let config = DatabaseConfig::from_env();
    let catalog = Catalog::builtin()?;

    match cli.command {
        Commands::Run {
            status: true,
            json,
            ..
        } => {
            migrate::show_status(&config, &catalog, json).await?;
        }
        Commands::Run { target, .. } => {
            migrate::run_migrations(&config, &catalog, target.as_deref()).await?;
        }
        Commands::List => {
            print!("{}", migrate::format_catalog(&catalog));
        }
    }

    Ok(())
}
