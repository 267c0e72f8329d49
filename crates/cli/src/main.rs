//! Reorder Forecast CLI
//!
//! A command-line tool for loading the product catalog, training the
//! reorder classifier and reviewing per-product predictions.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::pipeline::{self, TrainArgs};

/// Reorder Forecast CLI
#[derive(Parser)]
#[command(name = "forecast")]
#[command(author, version, about = "CLI for the Reorder Forecast service", long_about = None)]
pub struct Cli {
    /// Service URL (can also be set via FORECAST_API_URL env var)
    #[arg(long, env = "FORECAST_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show pipeline status
    Status,

    /// Load the product catalog
    Load,

    /// Train the reorder model on the loaded catalog
    Train(TrainArgs),

    /// Show reorder predictions for every product
    Predictions {
        /// Only show products predicted to need reordering
        #[arg(long)]
        reorder_only: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Status => pipeline::show_status(&client, cli.format).await?,
        Commands::Load => pipeline::load_catalog(&client, cli.format).await?,
        Commands::Train(args) => pipeline::train(&client, &args, cli.format).await?,
        Commands::Predictions { reorder_only } => {
            pipeline::show_predictions(&client, reorder_only, cli.format).await?
        }
    }

    Ok(())
}
