// Occupancy Ledger
//
// Append-style audit log of occupancy sessions. Entries are rows in the
// store; the newest entry is always written at the fixed head row and an
// entry's only handle is its row index.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::address::{AddressError, RangeAddress, Row};
use crate::config::{LedgerLayout, LEDGER_WIDTH};
use crate::store::{CellValue, Grid, StoreError, TabularStore};

/// Row of a ledger entry inside the ledger sheet.
pub type RowIndex = Row;

/// One occupancy session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub seat_number: u32,
    pub occupant: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("malformed ledger row at `{address}`: {reason}")]
    Malformed { address: String, reason: String },
}

impl From<AddressError> for LedgerError {
    fn from(value: AddressError) -> Self {
        StoreError::from(value).into()
    }
}

/// Timestamps are stored as Unix seconds with millisecond precision.
pub fn to_serial(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

pub fn from_serial(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
}

/// Drop sub-millisecond precision so a timestamp survives a store round trip.
pub fn truncate_millis(time: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(time.timestamp_millis()).unwrap_or(time)
}

impl LedgerEntry {
    /// A freshly opened session.
    pub fn open(start_time: DateTime<Utc>, seat_number: u32, occupant: impl Into<String>) -> Self {
        Self {
            start_time: truncate_millis(start_time),
            end_time: None,
            seat_number,
            occupant: occupant.into(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn to_row(&self) -> Vec<CellValue> {
        vec![
            CellValue::Number(to_serial(self.start_time)),
            self.end_time.map(to_serial).into(),
            self.seat_number.into(),
            self.occupant.as_str().into(),
        ]
    }

    /// Parse a row as read from the store. Blank rows yield `Ok(None)`.
    pub fn from_row(row: &[CellValue]) -> Result<Option<Self>, String> {
        if row.iter().all(CellValue::is_empty) {
            return Ok(None);
        }

        let cell = |i: usize| row.get(i).cloned().unwrap_or_default();

        let start_time = cell(0)
            .as_f64()
            .and_then(from_serial)
            .ok_or("start time is not a timestamp")?;

        let end_time = match cell(1) {
            CellValue::Empty => None,
            other => Some(
                other
                    .as_f64()
                    .and_then(from_serial)
                    .ok_or("end time is not a timestamp")?,
            ),
        };

        let seat_number = cell(2).as_index().ok_or("seat is not a seat number")?;

        let occupant = match cell(3) {
            CellValue::Text(text) if !text.is_empty() => text,
            _ => return Err("occupant is missing".into()),
        };

        Ok(Some(Self {
            start_time,
            end_time,
            seat_number,
            occupant,
        }))
    }
}

/// Address builder and row codec over the ledger sheet.
#[derive(Debug, Clone)]
pub struct Ledger {
    layout: LedgerLayout,
}

impl Ledger {
    pub fn new(layout: LedgerLayout) -> Self {
        Self { layout }
    }

    pub fn head_row(&self) -> RowIndex {
        self.layout.head_row
    }

    fn rows_address(
        &self,
        first: RowIndex,
        last: Option<RowIndex>,
    ) -> Result<RangeAddress, AddressError> {
        let start = self.layout.first_column;
        let end = start.offset(LEDGER_WIDTH - 1)?;
        RangeAddress::range(self.layout.sheet.as_str(), start, first, end, last)
    }

    /// `sheet!C2:F2` for the default layout.
    pub fn head_address(&self) -> Result<RangeAddress, AddressError> {
        self.row_address(self.layout.head_row)
    }

    pub fn row_address(&self, row: RowIndex) -> Result<RangeAddress, AddressError> {
        self.rows_address(row, Some(row))
    }

    /// Every row from the head down: `sheet!C2:F`.
    pub fn all_address(&self) -> Result<RangeAddress, AddressError> {
        self.rows_address(self.layout.head_row, None)
    }

    pub fn end_time_address(&self, row: RowIndex) -> Result<RangeAddress, AddressError> {
        let column = self.layout.first_column.offset(1)?;
        RangeAddress::cell(self.layout.sheet.as_str(), column, row)
    }

    pub fn write_head<S: TabularStore>(
        &self,
        store: &mut S,
        entry: &LedgerEntry,
    ) -> Result<(), LedgerError> {
        let address = self.head_address()?;
        debug!(%address, seat = entry.seat_number, "writing ledger head");
        store.write(&address, vec![entry.to_row()])?;
        Ok(())
    }

    /// Fill the end time of the entry at `row`. Positional; the row's
    /// contents are not inspected.
    pub fn stamp_end<S: TabularStore>(
        &self,
        store: &mut S,
        row: RowIndex,
        end_time: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let address = self.end_time_address(row)?;
        debug!(%address, "stamping end time");
        store.write(&address, vec![vec![CellValue::Number(to_serial(end_time))]])?;
        Ok(())
    }

    pub fn read_row<S: TabularStore>(
        &self,
        store: &S,
        row: RowIndex,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let address = self.row_address(row)?;
        let grid = store.read(&address)?;
        let cells = grid.into_iter().next().unwrap_or_default();
        LedgerEntry::from_row(&cells).map_err(|reason| LedgerError::Malformed {
            address: address.to_string(),
            reason,
        })
    }

    /// Whether `entry` is visible at the head row or the row below it. The
    /// store may already have pushed a fresh entry one row down.
    pub fn entry_visible<S: TabularStore>(
        &self,
        store: &S,
        entry: &LedgerEntry,
    ) -> Result<bool, LedgerError> {
        let head = self.layout.head_row;
        let below = head.checked_add(1).ok_or(AddressError::RowOverflow)?;
        let address = self.rows_address(head, Some(below))?;
        let grid = store.read(&address)?;
        Ok(grid.iter().any(|cells| {
            matches!(LedgerEntry::from_row(cells), Ok(Some(found)) if &found == entry)
        }))
    }

    /// All parseable entries from the head down, newest first. Blank rows are
    /// skipped silently, malformed ones with a warning.
    pub fn read_all<S: TabularStore>(
        &self,
        store: &S,
    ) -> Result<Vec<(RowIndex, LedgerEntry)>, LedgerError> {
        let address = self.all_address()?;
        let grid = store.read(&address)?;
        Ok(self.parse_rows(&grid))
    }

    /// Decode a grid read from [`Ledger::all_address`].
    pub fn parse_rows(&self, grid: &Grid) -> Vec<(RowIndex, LedgerEntry)> {
        let mut entries = Vec::new();
        for (offset, cells) in grid.iter().enumerate() {
            let Some(row) = RowIndex::try_from(offset)
                .ok()
                .and_then(|offset| self.layout.head_row.checked_add(offset))
            else {
                break;
            };
            match LedgerEntry::from_row(cells) {
                Ok(Some(entry)) => entries.push((row, entry)),
                Ok(None) => {}
                Err(reason) => warn!(row, %reason, "skipping malformed ledger row"),
            }
        }
        entries
    }
}
