//! `slotwise` CLI — run the scheduling engine against a calendar snapshot.
//!
//! ## Usage
//!
//! ```sh
//! # Propose slots for a request against a snapshot of busy events
//! slotwise propose --events calendar.json --request request.json
//!
//! # Same, reading the request from stdin and emitting JSON
//! cat request.json | slotwise propose --events calendar.json --json
//!
//! # Expand a recurrence rule into concrete dates
//! slotwise expand --frequency weekly --days mon,wed \
//!     --anchor 2026-03-02 --until 2026-03-18
//!
//! # Skip a holiday week
//! slotwise expand --frequency weekly --days mon \
//!     --anchor 2026-03-02 --until 2026-03-30 --except 2026-03-09:2026-03-13
//! ```

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc, Weekday};
use clap::{Parser, Subcommand};
use std::io::{self, Read};

use slotwise_engine::{
    recurrence, DateRange, EngineConfig, Frequency, MemoryCalendar, RawEvent, RecurrenceRule,
    SchedulingEngine, SlotRequest, UntilSpec,
};

#[derive(Parser)]
#[command(name = "slotwise", version, about = "Smart scheduling engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Propose conflict-free slots for a request against a calendar snapshot
    Propose {
        /// JSON file with the busy-event snapshot (array of raw events)
        #[arg(short, long)]
        events: String,
        /// JSON file with the slot request (reads from stdin if omitted)
        #[arg(short, long)]
        request: Option<String>,
        /// IANA reference timezone (overrides the config's zone)
        #[arg(short, long)]
        timezone: Option<String>,
        /// Engine configuration JSON file
        #[arg(short, long)]
        config: Option<String>,
        /// Emit the full proposal set as JSON
        #[arg(long)]
        json: bool,
    },
    /// Expand a recurrence rule into concrete occurrence dates
    Expand {
        #[arg(long, value_parser = ["weekly", "biweekly", "custom"])]
        frequency: String,
        /// Week interval (ignored for biweekly)
        #[arg(long, default_value_t = 1)]
        interval: u32,
        /// Comma-separated weekdays, e.g. "mon,wed"
        #[arg(long, default_value = "")]
        days: String,
        /// Anchor date (YYYY-MM-DD)
        #[arg(long)]
        anchor: NaiveDate,
        /// Last possible occurrence date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        until: NaiveDate,
        /// Exception date or range "START:END", repeatable
        #[arg(long = "except")]
        exceptions: Vec<String>,
    },
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Propose {
            events,
            request,
            timezone,
            config,
            json,
        } => propose(
            &events,
            request.as_deref(),
            timezone.as_deref(),
            config.as_deref(),
            json,
        ),
        Commands::Expand {
            frequency,
            interval,
            days,
            anchor,
            until,
            exceptions,
        } => expand(&frequency, interval, &days, anchor, until, &exceptions),
    }
}

fn propose(
    events_path: &str,
    request_path: Option<&str>,
    timezone: Option<&str>,
    config_path: Option<&str>,
    json: bool,
) -> Result<()> {
    let events_json = std::fs::read_to_string(events_path)
        .with_context(|| format!("Failed to read events file: {}", events_path))?;
    let events: Vec<RawEvent> =
        serde_json::from_str(&events_json).context("Failed to parse events JSON")?;

    let request_json = read_input(request_path)?;
    let request: SlotRequest =
        serde_json::from_str(&request_json).context("Failed to parse request JSON")?;

    let mut config = match config_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            serde_json::from_str(&raw).context("Failed to parse config JSON")?
        }
        None => EngineConfig::default(),
    };
    if let Some(zone) = timezone {
        config.timezone = zone.to_string();
    }

    let mut engine =
        SchedulingEngine::new(MemoryCalendar::new(events), MemoryCalendar::default(), config)?;
    let set = engine.propose(request.clone(), Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&set)?);
        return Ok(());
    }

    println!(
        "Proposals for '{}' ({} min, {}x):",
        request.title, request.duration_minutes, request.count
    );
    for view in &set.views {
        match &view.second_chunk_time {
            Some(second) => println!(
                "  {}. {} at {} and {}  [score {:.1}]",
                view.index + 1,
                view.day_label,
                view.display_time,
                second,
                view.score
            ),
            None => println!(
                "  {}. {} at {}  [score {:.1}]",
                view.index + 1,
                view.day_label,
                view.display_time,
                view.score
            ),
        }
    }
    if set.needs_relaxation {
        println!(
            "\nFewer openings than requested. Consider a shorter duration, a wider \
             time range, or a different time of day."
        );
    }
    Ok(())
}

fn expand(
    frequency: &str,
    interval: u32,
    days: &str,
    anchor: NaiveDate,
    until: NaiveDate,
    exceptions: &[String],
) -> Result<()> {
    let frequency = match frequency {
        "weekly" => Frequency::Weekly,
        "biweekly" => Frequency::Biweekly,
        "custom" => Frequency::Custom,
        other => anyhow::bail!("Unknown frequency: {}", other),
    };

    let rule = RecurrenceRule {
        frequency,
        interval,
        days_of_week: parse_days(days)?,
        until: UntilSpec::Date(until),
        exceptions: parse_exceptions(exceptions)?,
    };

    let dates = recurrence::expand(&rule, anchor, None)?;
    for date in &dates {
        println!("{}", date);
    }
    Ok(())
}

/// Parse "mon,wed" into weekdays. An empty string means no explicit days.
fn parse_days(raw: &str) -> Result<Vec<Weekday>> {
    let mut days = Vec::new();
    for part in raw.split(',') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        let day: Weekday = trimmed
            .parse()
            .map_err(|_| anyhow::anyhow!("Unknown weekday: '{}'", trimmed))?;
        if !days.contains(&day) {
            days.push(day);
        }
    }
    Ok(days)
}

/// Parse exception arguments: a single date, or an inclusive "START:END".
fn parse_exceptions(raw: &[String]) -> Result<Vec<DateRange>> {
    let mut exceptions = Vec::new();
    for item in raw {
        let range = match item.split_once(':') {
            Some((start, end)) => DateRange {
                start: parse_date(start)?,
                end: parse_date(end)?,
            },
            None => DateRange::single(parse_date(item)?),
        };
        exceptions.push(range);
    }
    Ok(exceptions)
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid date: '{}'", raw))
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}
