//! Site Risk - command line entry point

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use site_risk_core::api::{self, CameraRegistration};
use site_risk_core::constants::APP_NAME;
use site_risk_core::logic::config::{PipelineConfig, RuntimeSwitches};

/// Construction-site risk monitoring
#[derive(Parser, Debug)]
#[command(name = APP_NAME, author, version, about, long_about = None)]
struct Args {
    /// SQLite database (overrides SITE_RISK_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// HSE rules JSON (overrides SITE_RISK_RULES_FILE)
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Activity model ONNX file (overrides SITE_RISK_MODEL)
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Use the heuristic classifier even when a model is configured
    #[arg(long, global = true, default_value_t = false)]
    no_model: bool,

    /// Do not write training records
    #[arg(long, global = true, default_value_t = false)]
    no_dataset: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema
    InitDb,

    /// Register (or update) a site and one of its cameras
    RegisterCamera {
        #[arg(long)]
        site_id: i64,
        #[arg(long, default_value = "")]
        site_name: String,
        #[arg(long)]
        camera_id: i64,
        #[arg(long, default_value = "")]
        camera_name: String,
        /// JSON object of class -> minimum confidence
        #[arg(long)]
        confidence: Option<String>,
        /// JSON file with a 3x3 image -> ground homography
        #[arg(long)]
        homography: Option<PathBuf>,
    },

    /// Import risk zones from a JSON file
    ImportZones {
        #[arg(long)]
        camera_id: i64,
        file: PathBuf,
    },

    /// Replay detector output (JSONL, one frame per line) into the database
    Ingest {
        #[arg(long)]
        camera_id: i64,
        input: PathBuf,
        /// Source stream fps
        #[arg(long)]
        fps: Option<f64>,
        /// Time of frame 0 (RFC 3339), for lines without a timestamp
        #[arg(long)]
        start: Option<DateTime<Utc>>,
    },

    /// Print one feature row per window (JSONL)
    Features {
        #[arg(long)]
        camera_id: i64,
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        #[arg(long)]
        max_windows: Option<usize>,
    },

    /// Assess risk per window and group alerts into incidents
    Assess {
        #[arg(long)]
        camera_id: i64,
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        #[arg(long)]
        max_windows: Option<usize>,
    },

    /// Merge the dataset files into one JSONL file
    ExportDataset { target: PathBuf },

    /// Show model, rules and dataset status
    Status,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = PipelineConfig::from_env();
    if let Some(db) = args.db {
        config.db_path = db;
    }
    if let Some(rules) = args.rules {
        config.rules_file = rules;
    }
    if let Some(model) = args.model {
        config.model_path = Some(model);
    }
    RuntimeSwitches::set_model(!args.no_model);
    RuntimeSwitches::set_dataset(!args.no_dataset);

    log::debug!("Configuration: {:?}", config);

    match args.command {
        Command::InitDb => {
            api::init_db(&config)?;
            println!("Database ready at {}", config.db_path.display());
        }
        Command::RegisterCamera {
            site_id,
            site_name,
            camera_id,
            camera_name,
            confidence,
            homography,
        } => {
            let registration = CameraRegistration {
                site_id,
                site_name,
                camera_id,
                camera_name,
                confidence_config: confidence,
            };
            api::register_camera(&config, &registration, homography.as_deref())?;
            println!("Camera {} registered", camera_id);
        }
        Command::ImportZones { camera_id, file } => {
            let count = api::import_zones(&config, camera_id, &file)?;
            println!("{} zones imported for camera {}", count, camera_id);
        }
        Command::Ingest {
            camera_id,
            input,
            fps,
            start,
        } => {
            let stats = api::ingest(&config, camera_id, &input, fps, start.unwrap_or_else(Utc::now))?;
            print_json(&stats)?;
        }
        Command::Features {
            camera_id,
            start,
            end,
            max_windows,
        } => {
            for row in api::extract_features(&config, camera_id, start, end, max_windows)? {
                println!("{}", serde_json::to_string(&row)?);
            }
        }
        Command::Assess {
            camera_id,
            start,
            end,
            max_windows,
        } => {
            let report = api::assess(&config, camera_id, start, end, max_windows)?;
            print_json(&report)?;
        }
        Command::ExportDataset { target } => {
            let files = api::export_dataset(&config, &target)?;
            println!("{} dataset files merged into {}", files, target.display());
        }
        Command::Status => {
            print_json(&api::get_engine_status(&config)?)?;
        }
    }

    Ok(())
}
