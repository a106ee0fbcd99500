// Booker Configuration
//
// Physical layout of the pointer table and the ledger inside the store,
// plus the knobs that change how a booking settles and verifies.

use serde::{Deserialize, Serialize};

use crate::address::{Column, Row};

/// Width of a ledger row: start, end, seat, occupant.
pub const LEDGER_WIDTH: u32 = 4;

/// Upper bound on `seat_count`.
pub const MAX_SEATS: u32 = 10_000;

const DEFAULT_POINTER_COLUMN: Column = Column::fixed(2); // B
const DEFAULT_LEDGER_COLUMN: Column = Column::fixed(3); // C

/// Configuration loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookerConfig {
    pub seat_count: u32,
    pub pointers: PointerLayout,
    pub ledger: LedgerLayout,

    #[serde(default)]
    pub settle: SettleStrategy,

    /// Check that a ledger row still belongs to the seat before stamping it.
    #[serde(default)]
    pub verify_ledger_rows: bool,
}

/// Where the per-seat row pointers live. Seat `s` is at `first_row + s - 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerLayout {
    pub sheet: String,
    pub column: Column,
    pub first_row: Row,
}

/// Where the ledger lives. Entries occupy `first_column` and the three
/// columns to its right; the newest entry is always written at `head_row`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerLayout {
    pub sheet: String,
    pub first_column: Column,
    pub head_row: Row,
}

/// How `take_a_seat` waits for the ledger write before touching pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SettleStrategy {
    /// Sleep for a fixed delay.
    Fixed { millis: u64 },

    /// Read the ledger head back until the entry is visible.
    Confirm { deadline_millis: u64, poll_millis: u64 },
}

impl Default for SettleStrategy {
    fn default() -> Self {
        SettleStrategy::Fixed { millis: 100 }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("seat_count must be at least 1")]
    NoSeats,

    #[error("{0} sheet name is empty")]
    EmptySheet(&'static str),

    #[error("seat_count {seat_count} exceeds the limit of {max}")]
    TooManySeats { seat_count: u32, max: u32 },

    #[error("{0} row numbers start at 1")]
    ZeroRow(&'static str),

    #[error("{0} layout runs past the last addressable row or column")]
    OutOfRange(&'static str),

    #[error("pointer rows reach the ledger head row {head_row} on sheet `{sheet}`")]
    Overlap { sheet: String, head_row: Row },

    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),
}

impl BookerConfig {
    /// Built-in layout used when no config file is given.
    pub fn default_config() -> Self {
        Self {
            seat_count: 40,
            pointers: PointerLayout {
                sheet: "current".into(),
                column: DEFAULT_POINTER_COLUMN,
                first_row: 2,
            },
            ledger: LedgerLayout {
                sheet: "sheet".into(),
                first_column: DEFAULT_LEDGER_COLUMN,
                head_row: 2,
            },
            settle: SettleStrategy::default(),
            verify_ledger_rows: false,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BookerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seat_count == 0 {
            return Err(ConfigError::NoSeats);
        }
        if self.pointers.sheet.is_empty() {
            return Err(ConfigError::EmptySheet("pointer"));
        }
        if self.ledger.sheet.is_empty() {
            return Err(ConfigError::EmptySheet("ledger"));
        }
        if self.pointers.first_row == 0 {
            return Err(ConfigError::ZeroRow("pointer"));
        }
        if self.ledger.head_row == 0 {
            return Err(ConfigError::ZeroRow("ledger"));
        }

        if self.seat_count > MAX_SEATS {
            return Err(ConfigError::TooManySeats {
                seat_count: self.seat_count,
                max: MAX_SEATS,
            });
        }

        let last_pointer_row = self
            .pointers
            .first_row
            .checked_add(self.seat_count - 1)
            .ok_or(ConfigError::OutOfRange("pointer"))?;
        // the confirm settle step reads one row below the head
        if self.ledger.head_row == Row::MAX
            || self.ledger.first_column.offset(LEDGER_WIDTH - 1).is_err()
        {
            return Err(ConfigError::OutOfRange("ledger"));
        }

        // head insertion shifts whole rows of the ledger sheet
        if self.pointers.sheet == self.ledger.sheet && last_pointer_row >= self.ledger.head_row {
            return Err(ConfigError::Overlap {
                sheet: self.pointers.sheet.clone(),
                head_row: self.ledger.head_row,
            });
        }

        Ok(())
    }
}
