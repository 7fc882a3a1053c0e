//! Inspection CLI for the respite capacity views and the daily dashboard.
//!
//! # Responsibility
//! - Open the configured database and print capacity views as JSON.
//! - Keep output deterministic so it can be diffed in local checks.

use carecentre_core::db::{open_db, schema_version};
use carecentre_core::{
    adjacent_months, calendar_weeks, core_version, init_logging, parse_date_or_today, ping,
    ActivityService, CapacityEngine, CoreConfig, DashboardService, SessionKind,
    SqliteActivityRepository, SqliteBookingRepository, SqliteMemberRepository,
};
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};
use log::info;
use serde_json::{json, Value};
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "carecentre")]
#[command(about = "Respite capacity views for the care centre database")]
#[command(version)]
struct Cli {
    /// SQLite database file (overrides CARECENTRE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Slots per half-session (overrides CARECENTRE_RESPITE_CAPACITY)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    capacity: Option<u32>,

    /// Absolute directory for rolling log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Approved usage and remaining slots for one day
    Slots {
        /// YYYY-MM-DD; unparsable input means today
        #[arg(long, default_value = "")]
        date: String,
    },
    /// Monday-to-Sunday tallies, shifted by whole weeks
    Week {
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i64,
    },
    /// Calendar grid with per-day tallies
    Month {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Utilization and condition mix around today
    Heatmap {
        #[arg(long, default_value_t = 7)]
        past: u32,
        #[arg(long, default_value_t = 7)]
        future: u32,
    },
    /// KPI tiles and the activities starting on one day
    Dashboard {
        /// YYYY-MM-DD; unparsable input means today
        #[arg(long, default_value = "")]
        date: String,
    },
    /// Check core linkage and that the database opens
    Ping,
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("failed to render output: {err}");
                std::process::exit(1);
            }
        },
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<Value, Box<dyn Error>> {
    let mut config = CoreConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(capacity) = cli.capacity {
        config.respite_capacity = capacity;
    }
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = Some(log_dir);
    }
    if let Some(log_dir) = &config.log_dir {
        init_logging(config.log_level, log_dir)?;
    }

    let conn = open_db(&config.db_path)?;
    let engine = CapacityEngine::new(
        SqliteBookingRepository::new(&conn),
        config.capacity_config(),
    );
    let today = Local::now().date_naive();
    info!(
        "event=cli_query module=cli status=start centre={} capacity={}",
        config.centre_name, config.respite_capacity
    );

    let output = match cli.command {
        Command::Slots { date } => {
            let date = parse_date_or_today(&date, today);
            let mut remaining = serde_json::Map::new();
            for session in SessionKind::ALL {
                remaining.insert(
                    session.as_str().to_string(),
                    json!(engine.remaining_slots(date, session)?),
                );
            }
            json!({
                "date": date,
                "summary": engine.daily_summary(date)?,
                "remaining": remaining,
            })
        }
        Command::Week { offset } => {
            json!({
                "offset": offset,
                "days": engine.week_summary(today, offset)?,
            })
        }
        Command::Month { year, month } => {
            let year = year.unwrap_or_else(|| today.year());
            let month = month.unwrap_or_else(|| today.month());
            let summary = engine.month_summary(year, month)?;
            let ((prev_year, prev_month), (next_year, next_month)) = adjacent_months(year, month);
            json!({
                "year": year,
                "month": month,
                "prev": { "year": prev_year, "month": prev_month },
                "next": { "year": next_year, "month": next_month },
                "weeks": calendar_weeks(year, month, today, &summary)?,
            })
        }
        Command::Heatmap { past, future } => {
            json!({ "days": engine.heatmap(past, future)? })
        }
        Command::Dashboard { date } => {
            let date = parse_date_or_today(&date, today);
            let dashboard = DashboardService::new(
                SqliteBookingRepository::new(&conn),
                SqliteMemberRepository::new(&conn),
                SqliteActivityRepository::new(&conn),
            );
            let activities = ActivityService::new(
                SqliteActivityRepository::new(&conn),
                SqliteMemberRepository::new(&conn),
            );
            json!({
                "date": date,
                "counts": dashboard.counts(date)?,
                "activities": activities.activities_on(date)?,
            })
        }
        Command::Ping => json!({
            "ping": ping(),
            "version": core_version(),
            "db_path": config.db_path,
            "schema_version": schema_version(&conn)?,
        }),
    };
    Ok(output)
}
