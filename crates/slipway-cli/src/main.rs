mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "slipway", about = "Package serverless functions and static sites for deployment")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace and package every function, classify static assets, and build routes
    Package {
        /// Project root (where slipway.toml lives)
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Print the full manifest as JSON instead of a summary
        #[arg(long)]
        json: bool,
        /// Write the JSON manifest to a file
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Package functions in parallel (overrides [pipeline].parallel)
        #[arg(long)]
        parallel: bool,
    },
    /// Print the route table for the built static site
    Routes {
        /// Project root (where slipway.toml lives)
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Package {
            dir,
            json,
            out,
            parallel,
        } => commands::package(dir, json, out, parallel).await?,
        Commands::Routes { dir } => commands::routes(&dir).await?,
    }

    Ok(())
}
