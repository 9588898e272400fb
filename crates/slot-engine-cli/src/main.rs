//! `slotctl` -- generate, lay out and check interview slots from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Plan 30-minute slots on two days, checked against an existing configuration
//! slotctl bulk --days monday,wednesday --start 09:00 --end 11:00 --duration 30 \
//!     --existing configuration.json
//!
//! # Print the weekly grid of a saved configuration
//! slotctl grid -i configuration.json
//!
//! # Position one day's interviews on the calendar grid
//! slotctl layout -i events.json --date 2026-03-16
//!
//! # Check a panelist before booking
//! slotctl check --panelist pat@example.com --date 2026-03-16 \
//!     --start 14:30 --end 15:30 -i commitments.json
//!
//! # Do two windows overlap?
//! slotctl overlap 09:00 30 09:30 30
//! ```
//!
//! Engine settings come from `--config <file.toml>`; `RUST_LOG` or `-v`
//! controls log output on stderr.

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use slot_engine::layout::{layout_records, EventRecord};
use slot_engine::slots::DisplaySlot;
use slot_engine::store::InMemoryCommitments;
use slot_engine::time::parse_date;
use slot_engine::{
    layout_day, overlaps, plan_bulk_slots, time_to_minutes, weekly_grid, AvailabilityChecker,
    AvailabilityState, BatchPolicy, BulkSlotRequest, Commitment, DayOfWeek, EngineConfig,
    EngineError, ProposedInterview, SlotConfiguration, TimeBoundary, TimeOfDay,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "slotctl",
    version,
    about = "Interview slot generation, layout and availability checks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan the same run of slots on several days
    Bulk {
        /// Comma-separated days (e.g. "monday,wed")
        #[arg(long, value_delimiter = ',', required = true)]
        days: Vec<String>,
        /// First slot start (HH:MM)
        #[arg(long)]
        start: String,
        /// End of the range (HH:MM)
        #[arg(long)]
        end: String,
        /// Minutes per slot (defaults to the configured slot duration)
        #[arg(long)]
        duration: Option<u32>,
        /// Existing slot configuration (JSON) to check for conflicts
        #[arg(long)]
        existing: Option<String>,
        /// Reject only conflicting days instead of the whole batch
        #[arg(long)]
        per_day: bool,
    },
    /// Print the weekly grid of a slot configuration
    Grid {
        /// Slot configuration JSON (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Print JSON instead of one line per slot
        #[arg(long)]
        json: bool,
    },
    /// Position calendar events for display
    Layout {
        /// Events JSON array (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Only lay out events starting on this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Check a panelist's availability for a proposed interview
    Check {
        #[arg(long)]
        panelist: String,
        /// Interview date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Start time (HH:MM)
        #[arg(long)]
        start: String,
        /// End time (HH:MM)
        #[arg(long)]
        end: String,
        /// Commitments JSON array (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Report whether two windows overlap
    Overlap {
        /// First window start (HH:MM)
        start_a: String,
        /// First window length in minutes
        duration_a: u32,
        /// Second window start (HH:MM)
        start_b: String,
        /// Second window length in minutes
        duration_b: u32,
    },
}

/// A commitment file entry: the commitment plus whose calendar it is on.
#[derive(Deserialize)]
struct CommitmentEntry {
    panelist_email: String,
    #[serde(flatten)]
    commitment: Commitment,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = EngineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    tracing::debug!(timezone = %config.timezone, "configuration loaded");

    match cli.command {
        Commands::Bulk {
            days,
            start,
            end,
            duration,
            existing,
            per_day,
        } => {
            let days = days
                .iter()
                .map(|d| d.parse::<DayOfWeek>())
                .collect::<Result<Vec<_>, _>>()?;
            let request = BulkSlotRequest {
                days,
                start: TimeOfDay::parse(&start)?,
                end: TimeBoundary::parse(&end)?,
                duration: duration.unwrap_or(config.scheduling.default_slot_duration),
            };

            let existing = match existing {
                Some(path) => {
                    let json = read_input(Some(&path))?;
                    let configuration: SlotConfiguration = serde_json::from_str(&json)
                        .with_context(|| format!("Invalid slot configuration in {}", path))?;
                    configuration.slots
                }
                None => Vec::new(),
            };

            let policy = if per_day {
                BatchPolicy::PerDay
            } else {
                config.scheduling.batch_policy()
            };

            let outcome = match plan_bulk_slots(&request, &existing, policy) {
                Ok(outcome) => outcome,
                Err(EngineError::Conflict { day, conflicts }) => {
                    let lines: Vec<String> = conflicts.iter().map(|c| format!("  {}", c)).collect();
                    anyhow::bail!(
                        "Slots on {} conflict with existing slots; nothing was created:\n{}",
                        day,
                        lines.join("\n")
                    );
                }
                Err(e) => return Err(e.into()),
            };

            for (day, conflicts) in &outcome.rejected {
                eprintln!("skipped {}: {} conflict(s)", day, conflicts.len());
            }
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Grid { input, json } => {
            let text = read_input(input.as_deref())?;
            let configuration: SlotConfiguration =
                serde_json::from_str(&text).context("Invalid slot configuration JSON")?;
            configuration.validate()?;
            let grid = weekly_grid(&configuration);

            if json {
                println!("{}", serde_json::to_string_pretty(&grid)?);
            } else {
                for slot in grid.values().flatten() {
                    println!("{}", grid_line(slot));
                }
            }
        }
        Commands::Layout {
            input,
            date,
            output,
        } => {
            let text = read_input(input.as_deref())?;
            let records: Vec<EventRecord> =
                serde_json::from_str(&text).context("Invalid events JSON")?;

            let positioned = match date {
                Some(date) => {
                    let date = parse_date(&date)?;
                    let events: Vec<_> = records
                        .into_iter()
                        .filter_map(|r| match r.into_event(config.timezone) {
                            Ok(event) => Some(event),
                            Err(e) => {
                                tracing::warn!(error = %e, "dropping event from layout");
                                None
                            }
                        })
                        .filter(|e| config.timezone.local_date(e.start) == date)
                        .collect();
                    layout_day(&events, &config.layout, config.timezone)
                }
                None => layout_records(records, &config.layout, config.timezone),
            };

            write_output(output.as_deref(), &serde_json::to_string_pretty(&positioned)?)?;
        }
        Commands::Check {
            panelist,
            date,
            start,
            end,
            input,
        } => {
            let proposal = ProposedInterview::parse(&panelist, &date, &start, &end)?;
            let text = read_input(input.as_deref())?;
            let entries: Vec<CommitmentEntry> =
                serde_json::from_str(&text).context("Invalid commitments JSON")?;

            let source = InMemoryCommitments::with_commitments(
                config.timezone,
                entries.into_iter().map(|e| (e.panelist_email, e.commitment)),
            );
            let checker = AvailabilityChecker::new(source, config.timezone);

            match checker.check(&proposal).await? {
                AvailabilityState::Available(_) => println!("available"),
                AvailabilityState::Unavailable(result) => {
                    println!("unavailable");
                    for c in &result.conflicts {
                        println!(
                            "  {} {} / {}",
                            c.window_label(config.timezone),
                            c.job_title.as_deref().unwrap_or(&c.job_id),
                            c.candidate_name.as_deref().unwrap_or(&c.candidate_id)
                        );
                    }
                }
                AvailabilityState::Error { message } => {
                    println!("unknown");
                    eprintln!("availability could not be verified: {}", message);
                }
                AvailabilityState::Idle | AvailabilityState::Checking => {
                    anyhow::bail!("availability check did not complete");
                }
            }
        }
        Commands::Overlap {
            start_a,
            duration_a,
            start_b,
            duration_b,
        } => {
            let a = time_to_minutes(&start_a)?;
            let b = time_to_minutes(&start_b)?;
            let result = overlaps(
                i64::from(a),
                i64::from(duration_a),
                i64::from(b),
                i64::from(duration_b),
            );
            println!("{}", result);
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn grid_line(slot: &DisplaySlot) -> String {
    format!("{} {}", slot.day, slot.window)
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

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
