//! # Crop Advisor CLI (`crop`)
//!
//! The `crop` binary trains and queries the crop recommendation model and
//! runs the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! crop --config ./config/crop.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `crop init` | Create the SQLite database and run schema migrations |
//! | `crop train` | Train the model from the labelled corpus and save it |
//! | `crop predict` | Recommend crops for one soil/weather reading |
//! | `crop ask "<question>"` | Ask the farming FAQ (no config needed) |
//! | `crop serve` | Start the HTTP API |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crop_advisor::{config, logging, migrate, predict_cmd, server, train_cmd};
use crop_advisor_core::knowledge;
use crop_advisor_core::FeatureVector;

/// Crop Advisor: crop recommendations from soil and weather measurements.
#[derive(Parser)]
#[command(
    name = "crop",
    about = "Crop Advisor: crop recommendations from soil and weather measurements",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/crop.toml`. See `config/crop.example.toml`.
    #[arg(long, global = true, default_value = "./config/crop.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the farms, soil_reports,
    /// recommendations, and feedback tables. Safe to run repeatedly.
    Init,

    /// Train the model and save its artifacts.
    ///
    /// Replaces the artifacts in `[model].artifact_dir` only when training
    /// succeeds.
    Train {
        /// Labelled CSV to train from instead of `[model].corpus_path`.
        #[arg(long)]
        corpus: Option<PathBuf>,
    },

    /// Recommend up to three crops for one reading.
    ///
    /// Trains the model first if no saved artifacts are usable.
    Predict {
        /// Nitrogen (kg/ha).
        #[arg(long = "n")]
        n: f64,
        /// Phosphorus (kg/ha).
        #[arg(long = "p")]
        p: f64,
        /// Potassium (kg/ha).
        #[arg(long = "k")]
        k: f64,
        /// Temperature (°C).
        #[arg(long, allow_negative_numbers = true)]
        temperature: f64,
        /// Relative humidity (%).
        #[arg(long)]
        humidity: f64,
        /// Soil pH.
        #[arg(long)]
        ph: f64,
        /// Rainfall (mm).
        #[arg(long)]
        rainfall: f64,
    },

    /// Ask the farming FAQ a question.
    Ask {
        /// The question, e.g. "how do I grow rice?"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Start the HTTP API server.
    ///
    /// Binds to `[server].bind` once the model is ready.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Ask { question } = &cli.command {
        logging::init("warn");
        let reply = match knowledge::answer(&question.join(" ")) {
            Ok(reply) => reply,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        };
        println!("[{}]", reply.category);
        println!();
        println!("{}", reply.response);
        println!();
        println!("Try asking:");
        for suggestion in &reply.suggestions {
            println!("  - {}", suggestion);
        }
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging.level);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Train { corpus } => {
            tokio::task::spawn_blocking(move || train_cmd::run_train(&cfg, corpus.as_deref()))
                .await??;
        }
        Commands::Predict {
            n,
            p,
            k,
            temperature,
            humidity,
            ph,
            rainfall,
        } => {
            let input = FeatureVector {
                n,
                p,
                k,
                temperature,
                humidity,
                ph,
                rainfall,
            };
            tokio::task::spawn_blocking(move || predict_cmd::run_predict(&cfg, &input)).await??;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
