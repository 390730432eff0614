use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facewatch_core::{Identity, OnnxLandmarkProvider};
use facewatch_store::{RecordStore, StoreError};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;

use config::Config;
use engine::Engine;

#[derive(Parser)]
#[command(name = "facewatch", about = "Enroll people by photograph and recognize them later")]
struct Cli {
    /// SQLite database path (overrides FACEWATCH_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Match distance ceiling (overrides FACEWATCH_MATCH_THRESHOLD)
    #[arg(long, global = true)]
    threshold: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a person from a photograph
    Enroll {
        #[arg(long)]
        name: String,
        #[arg(long)]
        surname: String,
        /// Unique person code
        #[arg(long)]
        code: String,
        #[arg(long)]
        email: String,
        /// Raise an alert whenever this person is recognized
        #[arg(long)]
        flagged: bool,
        /// Photograph of the person
        image: PathBuf,
    },
    /// Identify the person in a photograph
    Recognize {
        image: PathBuf,
    },
    /// Print the descriptor of a photograph without storing it
    Describe {
        image: PathBuf,
    },
    /// List enrolled people
    List,
    /// Show one enrolled person
    Show {
        id: i64,
    },
    /// Edit the identity fields of an enrolled person
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        surname: Option<String>,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        flagged: Option<bool>,
    },
    /// Remove an enrolled person
    Remove {
        id: i64,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "request failed");
            println!("{}", json!({ "error": format!("{e:#}") }));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Value> {
    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(threshold) = cli.threshold {
        config.match_threshold = threshold;
    }
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Enroll {
            name,
            surname,
            code,
            email,
            flagged,
            image,
        } => {
            let store = open_store(&config)?;
            let identity = Identity {
                name,
                surname,
                code,
                email,
                flagged,
            };
            let record = load_engine(&config)?.enroll(&store, &identity, &image)?;
            Ok(json!({ "message": "person enrolled", "record": record }))
        }
        Commands::Recognize { image } => {
            let store = open_store(&config)?;
            let recognition = load_engine(&config)?.recognize(&store, &image)?;
            Ok(serde_json::to_value(recognition.report())?)
        }
        Commands::Describe { image } => {
            let descriptor = load_engine(&config)?.describe_file(&image)?;
            Ok(json!({ "length": descriptor.len(), "descriptor": descriptor }))
        }
        Commands::List => {
            let records = open_store(&config)?.list()?;
            Ok(serde_json::to_value(records)?)
        }
        Commands::Show { id } => {
            let record = open_store(&config)?
                .get(id)?
                .ok_or(StoreError::NotFound(id))?;
            Ok(serde_json::to_value(record)?)
        }
        Commands::Edit {
            id,
            name,
            surname,
            code,
            email,
            flagged,
        } => {
            let store = open_store(&config)?;
            let current = store.get(id)?.ok_or(StoreError::NotFound(id))?.identity;
            let identity = Identity {
                name: name.unwrap_or(current.name),
                surname: surname.unwrap_or(current.surname),
                code: code.unwrap_or(current.code),
                email: email.unwrap_or(current.email),
                flagged: flagged.unwrap_or(current.flagged),
            };
            let record = store.update(id, &identity)?;
            Ok(json!({ "message": "person updated", "record": record }))
        }
        Commands::Remove { id } => {
            open_store(&config)?.delete(id)?;
            Ok(json!({ "message": "person removed", "id": id }))
        }
    }
}

fn open_store(config: &Config) -> Result<RecordStore> {
    RecordStore::open(&config.db_path)
        .with_context(|| format!("opening record store at {}", config.db_path.display()))
}

fn load_engine(config: &Config) -> Result<Engine<OnnxLandmarkProvider>> {
    let provider = OnnxLandmarkProvider::load(
        &config.detector_model_path(),
        &config.landmark_model_path(),
        config.face_score_threshold,
    )?;
    Ok(Engine::new(provider, config.match_threshold).with_upload_dir(&config.upload_dir))
}
