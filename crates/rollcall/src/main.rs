//! rollcall - attendance check-in from the command line
//!
//! Wires together:
//! - Configuration loading
//! - Store initialization (checked sessions, audit log)
//! - Check-in engine
//! - HTTP attendance backend and a fixed-coordinate location source

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use clap::{Args as ClapArgs, Parser, Subcommand};
use rollcall_api::{SessionRecord, SessionView};
use rollcall_config::{Policy, load_config};
use rollcall_core::{CheckInEngine, CheckInOutcome};
use rollcall_host_api::StaticLocation;
use rollcall_host_http::{HttpAttendanceBackend, HttpBackendConfig};
use rollcall_store::{SqliteStore, Store};
use rollcall_util::{
    DATABASE_FILENAME, GeoPoint, SessionId, StudentId, default_config_path, distance_meters,
    format_duration, is_within_schedule,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// rollcall - Geofenced, time-windowed attendance check-in
#[derive(Parser, Debug)]
#[command(name = "rollcall")]
#[command(about = "Geofenced, time-windowed attendance check-in", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/rollcall/config.toml)
    #[arg(short, long, global = true, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set ROLLCALL_DATA_DIR env var)
    #[arg(short, long, global = true, env = "ROLLCALL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether a time falls inside a weekly schedule window
    Schedule {
        /// Day name, e.g. "Mon" or "monday"
        day: String,
        /// Time range, "HH:MM-HH:MM"
        range: String,
        /// Time to test, "YYYY-MM-DD HH:MM" (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Great-circle distance between two coordinates, in meters
    Distance {
        #[arg(allow_negative_numbers = true)]
        lat1: f64,
        #[arg(allow_negative_numbers = true)]
        lon1: f64,
        #[arg(allow_negative_numbers = true)]
        lat2: f64,
        #[arg(allow_negative_numbers = true)]
        lon2: f64,
    },

    /// Evaluate and submit a check-in
    CheckIn {
        #[command(flatten)]
        sessions: SessionsFile,

        /// Session to check into
        #[arg(long)]
        session: String,

        /// Student identifier sent with the check-in
        #[arg(long)]
        student: String,

        /// Device latitude (omit both to report the location as unavailable)
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Device longitude
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        #[command(flatten)]
        auth: Auth,
    },

    /// List sessions with their check-in state
    Sessions {
        #[command(flatten)]
        sessions: SessionsFile,

        /// Only show sessions whose id, title or course code contains TEXT
        #[arg(long, value_name = "TEXT")]
        search: Option<String>,
    },

    /// Inspect or clear the local check-in history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Open or close attendance for a session (teacher)
    Toggle {
        #[arg(long)]
        session: String,

        #[arg(long, conflicts_with = "close", required_unless_present = "close")]
        open: bool,

        #[arg(long)]
        close: bool,

        #[command(flatten)]
        auth: Auth,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// Sessions already checked into
    List,
    /// Forget every checked session
    Clear,
    /// Recent audit events as JSON lines
    Audit {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(ClapArgs, Debug)]
struct SessionsFile {
    /// JSON file holding an array of session records
    #[arg(long = "sessions", value_name = "FILE")]
    path: PathBuf,
}

#[derive(ClapArgs, Debug)]
struct Auth {
    /// Bearer token for the attendance backend
    #[arg(long, env = "ROLLCALL_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

fn load_policy(path: &Path) -> Result<Policy> {
    if !path.exists() {
        debug!(config_path = %path.display(), "No config file, using defaults");
        return Ok(Policy::default());
    }

    let policy = load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?;
    info!(
        config_path = %path.display(),
        radius_meters = policy.geofence.radius_meters,
        "Configuration loaded"
    );
    Ok(policy)
}

fn load_sessions(path: &Path) -> Result<Vec<SessionRecord>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read sessions from {:?}", path))?;
    let sessions: Vec<SessionRecord> =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse sessions in {:?}", path))?;
    debug!(count = sessions.len(), "Sessions loaded");
    Ok(sessions)
}

fn open_store(args: &Args, policy: &Policy) -> Result<Arc<dyn Store>> {
    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| policy.service.data_dir.clone());

    std::fs::create_dir_all(&data_dir).with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    let db_path = data_dir.join(DATABASE_FILENAME);
    let store = SqliteStore::open(&db_path).with_context(|| format!("Failed to open database {:?}", db_path))?;
    info!(db_path = %db_path.display(), "Store initialized");

    Ok(Arc::new(store))
}

fn build_engine(
    args: &Args,
    policy: Policy,
    location: StaticLocation,
    token: Option<String>,
) -> Result<CheckInEngine> {
    let store = open_store(args, &policy)?;
    let backend =
        HttpAttendanceBackend::new(HttpBackendConfig::parse(&policy.service.api_base_url)?.with_token(token))?;

    Ok(CheckInEngine::new(policy, store, Arc::new(location), Arc::new(backend)))
}

fn parse_at(text: &str) -> Result<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%d %H:%M")
        .with_context(|| format!("Invalid time {:?}, expected \"YYYY-MM-DD HH:MM\"", text))?;

    match Local.from_local_datetime(&naive).earliest() {
        Some(dt) => Ok(dt),
        None => bail!("{:?} does not exist in the local time zone", text),
    }
}

fn matches_search(session: &SessionRecord, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    session.id.as_str().to_lowercase().contains(&needle)
        || session.title.to_lowercase().contains(&needle)
        || session
            .course_code
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains(&needle))
}

fn print_view(view: &SessionView) {
    let state = if view.already_checked {
        "checked".to_string()
    } else if view.can_check_in {
        match view.closes_in {
            Some(left) => format!("check-in open, closes in {}", format_duration(left)),
            None => "check-in open".to_string(),
        }
    } else if !view.open {
        "closed".to_string()
    } else {
        "not in progress".to_string()
    };

    let course = view.course_code.as_deref().unwrap_or("-");
    println!("{}\t{}\t{}\t{}", view.session_id, course, view.title, state);
}

async fn run(args: Args) -> Result<ExitCode> {
    match &args.command {
        Command::Schedule { day, range, at } => {
            let now = match at {
                Some(text) => parse_at(text)?,
                None => rollcall_util::now(),
            };
            let inside = is_within_schedule(day, range, &now);
            println!("{}", if inside { "in progress" } else { "not in progress" });
            Ok(if inside { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }

        Command::Distance { lat1, lon1, lat2, lon2 } => {
            let a = GeoPoint::new(*lat1, *lon1)?;
            let b = GeoPoint::new(*lat2, *lon2)?;
            println!("{:.2}", distance_meters(&a, &b));
            Ok(ExitCode::SUCCESS)
        }

        Command::CheckIn {
            sessions,
            session,
            student,
            lat,
            lon,
            auth,
        } => {
            let records = load_sessions(&sessions.path)?;
            let session_id = SessionId::new(session.as_str());
            let Some(record) = records.iter().find(|s| s.id == session_id) else {
                bail!("Session {} not found in {:?}", session_id, sessions.path);
            };

            let location = match (lat, lon) {
                (Some(lat), Some(lon)) => StaticLocation::new(GeoPoint::new(*lat, *lon)?),
                _ => StaticLocation::unavailable(),
            };

            let policy = load_policy(&args.config)?;
            let engine = build_engine(&args, policy, location, auth.token.clone())?;

            let outcome = engine
                .request_check_in(record, &StudentId::new(student.as_str()), rollcall_util::now())
                .await;

            match outcome {
                CheckInOutcome::CheckedIn {
                    receipt,
                    distance_meters,
                    ..
                } => {
                    match distance_meters {
                        Some(d) => println!("Checked in to {} ({:.0} m from the classroom)", record.id, d),
                        None => println!("Checked in to {}", record.id),
                    }
                    if let Some(message) = receipt.message {
                        println!("{}", message);
                    }
                    Ok(ExitCode::SUCCESS)
                }
                CheckInOutcome::Denied { reason, .. } => {
                    println!("Check-in denied ({}): {}", reason.code(), reason);
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Command::Sessions { sessions, search } => {
            let mut records = load_sessions(&sessions.path)?;
            if let Some(needle) = search {
                records.retain(|s| matches_search(s, needle));
            }

            let policy = load_policy(&args.config)?;
            let engine = build_engine(&args, policy, StaticLocation::unavailable(), None)?;

            for view in engine.list_sessions(&records, rollcall_util::now()) {
                print_view(&view);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::History { action } => {
            let policy = load_policy(&args.config)?;
            match action {
                HistoryAction::List => {
                    let engine = build_engine(&args, policy, StaticLocation::unavailable(), None)?;
                    for id in engine.checked_sessions()? {
                        println!("{}", id);
                    }
                }
                HistoryAction::Clear => {
                    let engine = build_engine(&args, policy, StaticLocation::unavailable(), None)?;
                    let removed = engine.clear_history()?;
                    println!("Cleared {} checked session(s)", removed);
                }
                HistoryAction::Audit { limit } => {
                    let store = open_store(&args, &policy)?;
                    for event in store.get_recent_audits(*limit)? {
                        println!("{}", serde_json::to_string(&event)?);
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Toggle {
            session,
            open,
            close: _,
            auth,
        } => {
            let policy = load_policy(&args.config)?;
            let engine = build_engine(&args, policy, StaticLocation::unavailable(), auth.token.clone())?;
            let session_id = SessionId::new(session.as_str());

            engine
                .toggle_attendance(&session_id, *open)
                .await
                .with_context(|| format!("Failed to toggle attendance for {}", session_id))?;

            println!(
                "Attendance {} for {}",
                if *open { "opened" } else { "closed" },
                session_id
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    debug!(version = env!("CARGO_PKG_VERSION"), "rollcall starting");

    run(args).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike, Weekday};
    use rollcall_api::ScheduleDescriptor;

    #[test]
    fn cli_parses_check_in() {
        let args = Args::try_parse_from([
            "rollcall",
            "check-in",
            "--sessions",
            "sessions.json",
            "--session",
            "s001",
            "--student",
            "6501234",
            "--lat",
            "-33.86",
            "--lon",
            "151.2",
        ])
        .unwrap();

        match args.command {
            Command::CheckIn { lat, lon, .. } => {
                assert_eq!(lat, Some(-33.86));
                assert_eq!(lon, Some(151.2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_log_level_defaults_to_info() {
        let args = Args::try_parse_from(["rollcall", "history", "list"]).unwrap();
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn cli_requires_both_coordinates() {
        let result = Args::try_parse_from([
            "rollcall", "check-in", "--sessions", "s.json", "--session", "s001", "--student", "1", "--lat", "1.0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_toggle_needs_direction() {
        assert!(Args::try_parse_from(["rollcall", "toggle", "--session", "s001"]).is_err());
        assert!(Args::try_parse_from(["rollcall", "toggle", "--session", "s001", "--open", "--close"]).is_err());
        assert!(Args::try_parse_from(["rollcall", "toggle", "--session", "s001", "--close"]).is_ok());
    }

    #[test]
    fn parse_at_format() {
        let dt = parse_at("2025-12-29 10:30").unwrap();
        assert_eq!(dt.weekday(), Weekday::Mon);
        assert_eq!((dt.hour(), dt.minute()), (10, 30));
        assert!(parse_at("Monday 10:30").is_err());
    }

    #[test]
    fn search_matches_any_field() {
        let session = SessionRecord {
            id: SessionId::new("s001"),
            title: "Operating Systems".into(),
            course_code: Some("CS301".into()),
            is_attendance_open: true,
            schedule: ScheduleDescriptor::weekly("Mon", "09:00-12:00"),
            location: None,
        };

        assert!(matches_search(&session, "operating"));
        assert!(matches_search(&session, "cs3"));
        assert!(matches_search(&session, "S001"));
        assert!(!matches_search(&session, "networks"));
    }
}
