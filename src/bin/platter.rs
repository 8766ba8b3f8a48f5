//! Platter CLI - Command-line front end for the Platter state core
//!
//! Commands:
//! - replay: Feed a recorded gamepad-input stream through a controller session
//! - calendar: Print the heatmap for a year from the statistics file
//! - record: Upsert one day's count into the statistics file
//! - commit: Persist a live count for today and print the refreshed calendar
//! - doctor: Diagnose configuration and store health

use clap::{Parser, Subcommand, ValueEnum};
use chrono::{Datelike, NaiveDate};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use platter::schema::{PayloadReader, GamepadPayload};
use platter::types::{ControllerSnapshot, MonthBlock};
use platter::{
    event_channel, Clock, ControllerSession, FixedClock, JsonFileStore, LocalClock,
    PlatterConfig, PlatterError, StatisticsStore, StatsController, StatsView, PLATTER_VERSION,
    PRODUCER_NAME,
};

/// Platter - Controller state and play heatmap engine
#[derive(Parser)]
#[command(name = "platter")]
#[command(version = PLATTER_VERSION)]
#[command(about = "Replay controller events and inspect the play heatmap", long_about = None)]
struct Cli {
    /// Config file path (default: <config dir>/platter/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Statistics file path (overrides the config)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed a recorded event stream through a controller session
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Pause between events in milliseconds
        #[arg(long, default_value = "0")]
        gap_ms: u64,
    },

    /// Print the heatmap for a year
    Calendar {
        /// Year to show (default: the current year)
        #[arg(long)]
        year: Option<i32>,

        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,

        /// Output format (default: text on a terminal, json otherwise)
        #[arg(long)]
        format: Option<CalendarFormat>,
    },

    /// Set the count stored for one day
    Record {
        /// Day to update (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,

        /// Note count for that day
        #[arg(long)]
        count: u64,
    },

    /// Persist a live count for today, then reload the current year
    Commit {
        /// Live session note count
        #[arg(long)]
        count: u64,

        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,

        /// Output format (default: text on a terminal, json otherwise)
        #[arg(long)]
        format: Option<CalendarFormat>,
    },

    /// Diagnose configuration and store health
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one payload per line)
    Ndjson,
    /// JSON array of payloads
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum CalendarFormat {
    /// One glyph per day, one line per week
    Text,
    /// Full stats view as JSON
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), PlatterCliError> {
    let config_path = cli.config.clone().unwrap_or_else(PlatterConfig::default_path);
    let config = PlatterConfig::load(&config_path)?;

    let log_level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
    debug!(config = %config_path.display(), "configuration loaded");

    let store_path = cli.store.clone().unwrap_or_else(|| config.store_path.clone());

    match cli.command {
        Commands::Replay {
            input,
            input_format,
            gap_ms,
        } => cmd_replay(&config, &input, input_format, gap_ms).await,

        Commands::Calendar { year, today, format } => {
            cmd_calendar(&config, &store_path, year, today, format).await
        }

        Commands::Record { date, count } => cmd_record(&store_path, date, count).await,

        Commands::Commit { count, today, format } => {
            cmd_commit(&config, &store_path, count, today, format).await
        }

        Commands::Doctor { json } => cmd_doctor(&config_path, &store_path, json).await,
    }
}

async fn cmd_replay(
    config: &PlatterConfig,
    input: &Path,
    input_format: InputFormat,
    gap_ms: u64,
) -> Result<(), PlatterCliError> {
    let input_data = read_input(input)?;

    let (payloads, skipped_lines) = match input_format {
        InputFormat::Ndjson => {
            let stream = PayloadReader::parse_ndjson(&input_data);
            (stream.payloads, stream.skipped_lines)
        }
        InputFormat::Json => (PayloadReader::parse_array(&input_data)?, Vec::new()),
    };

    if payloads.is_empty() {
        return Err(PlatterCliError::NoEvents);
    }

    let rejected = PayloadReader::validate_payloads(&payloads);
    for issue in &rejected {
        debug!(index = issue.index, error = %issue.error, "payload will be dropped");
    }

    let snapshot = replay_payloads(config, payloads.clone(), Duration::from_millis(gap_ms)).await?;

    let report = ReplayReport {
        channel: config.channel.clone(),
        events: payloads.len(),
        skipped_lines,
        rejected_events: rejected.len(),
        snapshot,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn replay_payloads(
    config: &PlatterConfig,
    payloads: Vec<GamepadPayload>,
    gap: Duration,
) -> Result<ControllerSnapshot, PlatterCliError> {
    let mut session = ControllerSession::new(config.debounce());
    let (tx, rx) = event_channel(config.channel_capacity);
    session.subscribe(rx);

    for payload in payloads {
        tx.send(payload).await.map_err(|_| PlatterCliError::SessionClosed)?;
        if !gap.is_zero() {
            tokio::time::sleep(gap).await;
        }
    }

    // closing the channel ends the loop once the queue is drained
    drop(tx);
    session.closed().await;

    Ok(session.snapshot())
}

async fn cmd_calendar(
    config: &PlatterConfig,
    store_path: &Path,
    year: Option<i32>,
    today: Option<NaiveDate>,
    format: Option<CalendarFormat>,
) -> Result<(), PlatterCliError> {
    let clock = resolve_clock(today);
    let year = year.unwrap_or_else(|| clock.today().year());

    let store = Arc::new(JsonFileStore::with_clock(store_path, Arc::new(|| 0), clock.clone()));
    let controller = StatsController::new(store, clock, config.week_start);
    controller.select_year(year).await?;

    print_view(&controller.view(), format)
}

async fn cmd_record(store_path: &Path, date: NaiveDate, count: u64) -> Result<(), PlatterCliError> {
    let store = JsonFileStore::new(store_path, Arc::new(|| 0));
    store
        .update_statistics(date, count)
        .await
        .map_err(|e| PlatterError::Store {
            operation: "update_statistics",
            target: date.to_string(),
            source: e,
        })?;
    info!(%date, count, "statistics recorded");
    Ok(())
}

async fn cmd_commit(
    config: &PlatterConfig,
    store_path: &Path,
    count: u64,
    today: Option<NaiveDate>,
    format: Option<CalendarFormat>,
) -> Result<(), PlatterCliError> {
    let clock = resolve_clock(today);
    let store = Arc::new(JsonFileStore::with_clock(
        store_path,
        Arc::new(move || count),
        clock.clone(),
    ));
    let controller = StatsController::new(store, clock, config.week_start);
    controller.refresh().await?;

    print_view(&controller.view(), format)
}

async fn cmd_doctor(config_path: &Path, store_path: &Path, json: bool) -> Result<(), PlatterCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "platter_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Platter version {}", PLATTER_VERSION),
    });

    // Check config file
    if config_path.exists() {
        match fs::read_to_string(config_path)
            .map_err(PlatterError::from)
            .and_then(|content| PlatterConfig::from_toml(&content))
        {
            Ok(config) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Config valid (debounce {} ms, weeks start {:?})",
                    config.debounce_ms, config.week_start
                ),
            }),
            Err(e) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Invalid config file: {}", e),
            }),
        }
    } else {
        checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: format!("{} does not exist, using defaults", config_path.display()),
        });
    }

    // Check statistics file
    if store_path.exists() {
        let store = JsonFileStore::new(store_path, Arc::new(|| 0));
        match store.load_all().await {
            Ok(records) => checks.push(DoctorCheck {
                name: "store".to_string(),
                status: CheckStatus::Ok,
                message: format!("Statistics file valid ({} days recorded)", records.len()),
            }),
            Err(e) => checks.push(DoctorCheck {
                name: "store".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read statistics file: {}", e),
            }),
        }
    } else {
        checks.push(DoctorCheck {
            name: "store".to_string(),
            status: CheckStatus::Warning,
            message: format!("{} does not exist yet", store_path.display()),
        });
    }

    // Check stdin is available (for replay from a pipe)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (replay --input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: PLATTER_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Platter Doctor Report");
        println!("=====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PlatterCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, PlatterCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| format!("{}: {}", value, e))
}

fn resolve_clock(today: Option<NaiveDate>) -> Arc<dyn Clock> {
    match today {
        Some(date) => Arc::new(FixedClock(date)),
        None => Arc::new(LocalClock),
    }
}

fn print_view(view: &StatsView, format: Option<CalendarFormat>) -> Result<(), PlatterCliError> {
    let format = format.unwrap_or(if atty::is(atty::Stream::Stdout) {
        CalendarFormat::Text
    } else {
        CalendarFormat::Json
    });

    match format {
        CalendarFormat::Json => println!("{}", serde_json::to_string_pretty(view)?),
        CalendarFormat::Text => {
            let total: u64 = view.stats.values().sum();
            println!("Play heatmap {}", view.year);
            println!("=================");
            println!("Days recorded: {}", view.stats.len());
            println!("Total notes:   {}", total);
            for block in &view.months {
                println!();
                print!("{}", render_month(block));
            }
        }
    }
    Ok(())
}

fn render_month(block: &MonthBlock) -> String {
    let mut out = format!(
        "{} ({} notes, {} active days)\n",
        block.label,
        block.total_count(),
        block.active_days()
    );
    for week in &block.weeks {
        let cells: Vec<String> = week.days().iter().map(|d| d.level.glyph().to_string()).collect();
        out.push_str("  ");
        out.push_str(&cells.join(" "));
        out.push('\n');
    }
    out
}

// Error types

#[derive(Debug)]
enum PlatterCliError {
    Io(io::Error),
    Core(PlatterError),
    Json(serde_json::Error),
    NoEvents,
    SessionClosed,
    DoctorFailed,
}

impl From<io::Error> for PlatterCliError {
    fn from(e: io::Error) -> Self {
        PlatterCliError::Io(e)
    }
}

impl From<PlatterError> for PlatterCliError {
    fn from(e: PlatterError) -> Self {
        PlatterCliError::Core(e)
    }
}

impl From<serde_json::Error> for PlatterCliError {
    fn from(e: serde_json::Error) -> Self {
        PlatterCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PlatterCliError> for CliError {
    fn from(e: PlatterCliError) -> Self {
        match e {
            PlatterCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PlatterCliError::Core(e) => {
                let (code, hint) = match &e {
                    PlatterError::ConfigError(_) => ("CONFIG_ERROR", "Run 'platter doctor' to check the config file"),
                    PlatterError::Store { .. } => ("STORE_ERROR", "Run 'platter doctor' to check the statistics file"),
                    PlatterError::RefreshInProgress => ("BUSY", "Retry once the running refresh completes"),
                    PlatterError::InvalidYear(_) => ("INVALID_YEAR", "Pass a four-digit year"),
                    _ => ("INPUT_ERROR", "Check input format"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            PlatterCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PlatterCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            PlatterCliError::SessionClosed => CliError {
                code: "SESSION_CLOSED".to_string(),
                message: "Controller session stopped before the replay finished".to_string(),
                hint: None,
            },
            PlatterCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ReplayReport {
    channel: String,
    events: usize,
    skipped_lines: Vec<usize>,
    rejected_events: usize,
    snapshot: ControllerSnapshot,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
