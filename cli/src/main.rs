use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seatbook_kernel::ledger::{LedgerEntry, RowIndex};
use seatbook_kernel::{Booker, BookerConfig, BookingError, InMemoryStore};

/// Seat occupancy CLI
#[derive(Parser, Debug)]
#[command(name = "seatbook")]
#[command(about = "Seat occupancy tracker over a local store snapshot", long_about = None)]
struct Cli {
    /// Path to the store snapshot JSON (created when missing)
    #[arg(long)]
    state: String,

    /// Path to booker config JSON
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Claim a free seat
    Take { seat: u32, occupant: String },

    /// Release an occupied seat
    Return { seat: u32 },

    /// Show one seat, or every seat
    Status { seat: Option<u32> },

    /// List ledger entries, newest first
    Ledger,

    /// Check the pointer table against the ledger
    Audit,

    /// Rebuild the pointer table from the ledger
    Reconcile,
}

impl Command {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Command::Take { .. } | Command::Return { .. } | Command::Reconcile
        )
    }
}

/// One ledger row for JSON output
#[derive(Debug, Serialize)]
struct LedgerRow {
    row: RowIndex,
    #[serde(flatten)]
    entry: LedgerEntry,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seatbook=info,seatbook_kernel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // ----------------------------
    // Load config
    // ----------------------------
    let config = if let Some(path) = &cli.config {
        let data = fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
        BookerConfig::from_json(&data)?
    } else {
        BookerConfig::default_config()
    };

    // ----------------------------
    // Load store snapshot
    // ----------------------------
    let store = load_store(Path::new(&cli.state), &config)?;
    let mut booker = Booker::new(store, config)?;

    // ----------------------------
    // Run command
    // ----------------------------
    let outcome = run(&mut booker, &cli.command);

    if cli.command.mutates() {
        save_store(Path::new(&cli.state), booker.store())?;
    }

    // ----------------------------
    // Output
    // ----------------------------
    match outcome {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if is_refusal(&err) => {
            println!("{}", serde_json::to_string_pretty(&refusal(&err))?);
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}

fn run(
    booker: &mut Booker<InMemoryStore>,
    command: &Command,
) -> Result<serde_json::Value, BookingError> {
    let value = match command {
        Command::Take { seat, occupant } => {
            booker.take_a_seat(*seat, occupant)?;
            json!({ "seat": seat, "row": booker.seat_is_in_use(*seat)? })
        }
        Command::Return { seat } => {
            booker.return_a_seat(*seat)?;
            json!({ "seat": seat, "returned": true })
        }
        Command::Status { seat: Some(seat) } => {
            json!({ "seat": seat, "row": booker.seat_is_in_use(*seat)? })
        }
        Command::Status { seat: None } => json!(booker.current_state()?),
        Command::Ledger => {
            let rows: Vec<LedgerRow> = booker
                .ledger_entries()?
                .into_iter()
                .map(|(row, entry)| LedgerRow { row, entry })
                .collect();
            json!(rows)
        }
        Command::Audit => {
            booker.audit()?;
            json!({ "consistent": true })
        }
        Command::Reconcile => json!(booker.reconcile()?),
    };
    Ok(value)
}

fn is_refusal(err: &BookingError) -> bool {
    matches!(
        err,
        BookingError::SeatOccupied { .. }
            | BookingError::SeatNotOccupied { .. }
            | BookingError::InvalidSeat { .. }
            | BookingError::EmptyOccupant
            | BookingError::Invariant(_)
    )
}

fn refusal(err: &BookingError) -> serde_json::Value {
    match err {
        BookingError::SeatOccupied { seat, row } => {
            json!({ "error": err.to_string(), "seat": seat, "row": row })
        }
        BookingError::SeatNotOccupied { seat } | BookingError::InvalidSeat { seat, .. } => {
            json!({ "error": err.to_string(), "seat": seat })
        }
        BookingError::Invariant(violation) => {
            json!({ "error": err.to_string(), "invariant": violation.invariant })
        }
        _ => json!({ "error": err.to_string() }),
    }
}

fn load_store(path: &Path, config: &BookerConfig) -> Result<InMemoryStore> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "creating empty store snapshot");
        return Ok(InMemoryStore::new()
            .with_head_insertion(config.ledger.sheet.clone(), config.ledger.head_row));
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading store {}", path.display()))?;
    let store = serde_json::from_str(&data)
        .with_context(|| format!("parsing store {}", path.display()))?;
    Ok(store)
}

fn save_store(path: &Path, store: &InMemoryStore) -> Result<()> {
    let data = serde_json::to_string_pretty(store)?;
    fs::write(path, data).with_context(|| format!("writing store {}", path.display()))?;
    Ok(())
}
