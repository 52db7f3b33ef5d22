//! Health Risk Predictor CLI
//!
//! Queries a running prediction server, or runs predictions directly
//! against a local model directory.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, models, predict, schema};
use risk_lib::{ArtifactFormat, Subject};
use std::path::PathBuf;

/// Health Risk Predictor CLI
#[derive(Parser)]
#[command(name = "hrp")]
#[command(author, version, about = "CLI for the Health Risk Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via HRP_API_URL env var)
    #[arg(long, env = "HRP_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List targets, the features each needs, and model families
    Schema {
        /// Show the built-in schema instead of asking the server
        #[arg(long)]
        local: bool,
    },

    /// Predict every condition with every model family
    Predict {
        /// Feature value as NAME=VALUE, repeatable (e.g. -f Glucose=150)
        #[arg(long = "feature", short = 'f', value_parser = predict::parse_feature, required = true)]
        features: Vec<(String, f64)>,

        /// Subject name shown with the results
        #[arg(long)]
        name: Option<String>,

        /// Subject age shown with the results
        #[arg(long, requires = "name")]
        age: Option<u32>,

        /// Load artifacts from a local directory instead of calling the server
        #[arg(long)]
        local: bool,

        /// Model directory for --local (defaults to the config file value, then ./models)
        #[arg(long, env = "RISK_MODEL_DIR")]
        model_dir: Option<PathBuf>,

        /// Artifact format for --local (onnx or json)
        #[arg(long, default_value = "onnx")]
        artifact_format: ArtifactFormat,
    },

    /// Show model artifact coverage and the load cache
    Models,

    /// Drop cached models whose artifacts changed on disk
    Refresh,

    /// Show server health and readiness
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let api_url = config.api_url(cli.api_url);
    let verbose = cli.verbose;
    // Local commands never touch the server, so the URL is only parsed on demand
    let connect = || -> Result<client::ApiClient> {
        let client = client::ApiClient::new(&api_url)?;
        if verbose {
            output::print_info(&format!("Using API at {}", client.base_url()));
        }
        Ok(client)
    };

    // Execute command
    match cli.command {
        Commands::Schema { local: true } => {
            schema::show_schema(None, cli.format).await?;
        }
        Commands::Schema { local: false } => {
            schema::show_schema(Some(&connect()?), cli.format).await?;
        }
        Commands::Predict {
            features,
            name,
            age,
            local,
            model_dir,
            artifact_format,
        } => {
            let subject = name.map(|name| Subject { name, age });
            if local {
                let model_dir = config.model_dir(model_dir);
                if verbose {
                    output::print_info(&format!(
                        "Loading {} artifacts from {}",
                        artifact_format.suffix(),
                        model_dir.display()
                    ));
                }
                let target = predict::Target::Local {
                    model_dir: &model_dir,
                    artifact_format,
                };
                predict::predict(target, features, subject, cli.format).await?;
            } else {
                let client = connect()?;
                predict::predict(predict::Target::Remote(&client), features, subject, cli.format)
                    .await?;
            }
        }
        Commands::Models => {
            models::show_models(&connect()?, cli.format).await?;
        }
        Commands::Refresh => {
            models::refresh_models(&connect()?, cli.format).await?;
        }
        Commands::Health => {
            health::show_health(&connect()?, cli.format).await?;
        }
    }

    Ok(())
}
