//! rollcall-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, and serves the check-in API over HTTP.
//!
//! # Helper modes
//!
//! Load the student directory from a JSON array of profiles:
//!
//! ```
//! cargo run -p rollcall-server -- --import-students students.json
//! ```
//!
//! Print a fresh QR payload for one student:
//!
//! ```
//! cargo run -p rollcall-server -- --issue-token <STUDENT_KEY>
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chrono::Utc;
use clap::Parser;
use rollcall_core::{id::StudentKey, student::StudentProfile};
use rollcall_server::ServerConfig;
use rollcall_service::{BroadcastEvents, CheckInService};
use rollcall_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, sync::broadcast::error::RecvError};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Rollcall check-in server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Import student profiles from a JSON file and exit.
  #[arg(long, value_name = "FILE")]
  import_students: Option<PathBuf>,

  /// Print a fresh token payload for a student and exit.
  #[arg(long, value_name = "STUDENT_KEY")]
  issue_token: Option<StudentKey>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("ROLLCALL")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("previous_token_secrets"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  tracing::debug!(config = ?server_cfg, "configuration loaded");

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: import the student directory and exit.
  if let Some(path) = cli.import_students {
    let raw = std::fs::read_to_string(&path)
      .with_context(|| format!("failed to read {path:?}"))?;
    let profiles: Vec<StudentProfile> = serde_json::from_str(&raw)
      .with_context(|| format!("{path:?} is not a JSON array of student profiles"))?;
    let written = store
      .import_students(profiles)
      .await
      .context("student import failed")?;
    println!("imported {written} students");
    return Ok(());
  }

  let codec = server_cfg.codec().context("invalid token secret")?;
  let calendar = server_cfg.calendar().context("invalid utc_offset")?;
  let events = BroadcastEvents::default();
  spawn_event_log(&events);

  let service = CheckInService::new(Arc::new(store), codec, calendar)
    .with_events(Arc::new(events));

  // Helper mode: issue a token and exit.
  if let Some(student) = cli.issue_token {
    let issued = service
      .issue_token(student, Utc::now())
      .await
      .with_context(|| format!("failed to issue a token for {student}"))?;
    println!("{}", issued.payload);
    return Ok(());
  }

  let app = rollcall_server::router(Arc::new(service));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(offset = %calendar.offset(), "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Log every admission under the `rollcall::events` target.
fn spawn_event_log(events: &BroadcastEvents) {
  let mut rx = events.subscribe();
  tokio::spawn(async move {
    loop {
      match rx.recv().await {
        Ok(event) => tracing::info!(
          target: "rollcall::events",
          record = %event.record_id,
          student = %event.student_key,
          shift = %event.shift_id,
          slot = %event.slot,
          date = %event.date,
          "admission"
        ),
        Err(RecvError::Lagged(skipped)) => {
          tracing::warn!(target: "rollcall::events", skipped, "event log lagging");
        }
        Err(RecvError::Closed) => break,
      }
    }
  });
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
