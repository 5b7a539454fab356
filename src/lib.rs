mod utils;

pub mod categories;
pub mod clock;
pub mod commands;
pub mod db;
pub mod error;
pub mod report;
pub mod session;
pub mod settings;
pub mod tracker;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use categories::UserId;
use commands::{CommandRouter, Event, Reply};
use db::Database;
use report::ReportEngine;
use session::EditSessions;
use settings::{Settings, SettingsStore};
use tracker::TrackingController;

const ENABLE_LOGS: bool = true;
const LOG_TARGET: &str = "daytally";

#[derive(Debug, Parser)]
#[command(name = "daytally", version, about = "Life category time tracker")]
struct Cli {
    /// Settings file (JSON).
    #[arg(long, default_value = "daytally.json")]
    config: PathBuf,

    /// SQLite database path; overrides the settings file.
    #[arg(long)]
    db: Option<PathBuf>,

    /// IANA time zone for day boundaries, e.g. Asia/Dubai.
    #[arg(long, env = "DAYTALLY_TIME_ZONE")]
    time_zone: Option<String>,

    /// Write the effective settings back to the settings file.
    #[arg(long)]
    save_settings: bool,
}

/// Everything one running tracker needs, wired to a single database.
#[derive(Clone)]
pub struct App {
    db: Database,
    tracker: TrackingController,
    router: CommandRouter,
}

impl App {
    pub fn open(settings: &Settings) -> Result<Self> {
        let clock = settings.clock()?;
        let db = Database::new(settings.database_path.clone(), clock)?;
        Ok(Self::with_database(db))
    }

    pub fn with_database(db: Database) -> Self {
        let tracker = TrackingController::new(db.clone());
        let reports = ReportEngine::new(db.clone());
        let sessions = EditSessions::new(tracker.clone());
        let router = CommandRouter::new(tracker.clone(), reports, sessions);
        Self {
            db,
            tracker,
            router,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn tracker(&self) -> &TrackingController {
        &self.tracker
    }

    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    pub async fn handle(&self, event: &Event) -> Reply {
        self.router.handle(event).await
    }

    /// Slots left open by a previous run stay open; they are only reported.
    async fn report_open_slots(&self) -> Result<()> {
        let slots = self.db.list_open_slots().await?;
        if slots.is_empty() {
            log_info!("no open tracking slots");
        }
        for slot in slots {
            log_info!(
                "user {} still tracking {} since {}",
                slot.user_id,
                slot.category.as_str(),
                slot.start_instant
            );
        }
        Ok(())
    }
}

/// Splits an input line of the form `<userId> <text>`.
fn parse_event_line(line: &str) -> Option<(UserId, &str)> {
    let (user, text) = line.trim().split_once(char::is_whitespace)?;
    let user_id = user.parse().ok()?;
    Some((user_id, text.trim()))
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let store = SettingsStore::new(cli.config.clone())?;
    let settings = store.settings().with_overrides(cli.time_zone, cli.db);
    if cli.save_settings {
        store.update(settings.clone())?;
        log_info!("settings saved to {}", cli.config.display());
    }

    log_info!(
        "daytally starting: database {}, time zone {}",
        settings.database_path.display(),
        settings.time_zone
    );

    let app = App::open(&settings)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        app.report_open_slots().await?;
        serve_stdin(&app).await
    })
}

async fn serve_stdin(app: &App) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let Some((user_id, text)) = parse_event_line(&line) else {
            log_warn!("skipping malformed input line: {line}");
            continue;
        };

        let event = Event {
            user_id,
            text: text.to_string(),
            received_at: Utc::now(),
        };
        let reply = app.handle(&event).await;

        let mut encoded = serde_json::to_string(&reply)?;
        encoded.push('\n');
        stdout
            .write_all(encoded.as_bytes())
            .await
            .context("failed to write reply")?;
        stdout.flush().await.context("failed to flush reply")?;
    }

    log_info!("stdin closed, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_event_line;

    #[test]
    fn event_lines_carry_user_and_text() {
        assert_eq!(parse_event_line("42 /stop"), Some((42, "/stop")));
        assert_eq!(parse_event_line("  7   09:30 "), Some((7, "09:30")));
        assert_eq!(parse_event_line("7"), None);
        assert_eq!(parse_event_line("alice /stop"), None);
    }
}
