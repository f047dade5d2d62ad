mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "modelvault")]
#[command(author, version, about = "Save and load model artifacts, params and metrics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the params, metrics and models directories
    Init,

    /// Save run params and/or metrics (JSON objects with a "context" key)
    Results {
        /// Params file
        #[arg(short, long)]
        params: Option<PathBuf>,

        /// Metrics file
        #[arg(short, long)]
        metrics: Option<PathBuf>,
    },

    /// Register a serialized model file under a fresh timestamp
    Push {
        /// Model file written by the training framework
        file: PathBuf,
    },

    /// Load the most recent model
    Latest {
        /// Copy the model to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a batch of predictions as 256x128 grayscale PNG files
    Images {
        /// JSON file holding an array of flat prediction arrays
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// File name prefix
        #[arg(short, long, default_value = "pred")]
        name: String,
    },

    /// View or set configuration
    Config {
        /// Config key (e.g., "storage.target", "storage.bucket")
        key: Option<String>,

        /// Value to set (if omitted, shows current value)
        value: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            commands::init::execute().await?;
        }
        Commands::Results { params, metrics } => {
            commands::results::execute(params.as_deref(), metrics.as_deref()).await?;
        }
        Commands::Push { file } => {
            commands::push::execute(&file).await?;
        }
        Commands::Latest { output } => {
            commands::latest::execute(output.as_deref()).await?;
        }
        Commands::Images { input, out, name } => {
            commands::images::execute(&input, &out, &name).await?;
        }
        Commands::Config { key, value } => {
            commands::config::execute(key.as_deref(), value.as_deref()).await?;
        }
    }

    Ok(())
}
