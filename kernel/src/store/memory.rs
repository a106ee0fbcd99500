// In-Memory Tabular Store
//
// Sparse, serializable stand-in for the hosted store. Used by tests and by
// the CLI, which persists it as a JSON snapshot between invocations.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CellValue, Grid, StoreError, TabularStore};
use crate::address::{AddressError, CellRange, Column, RangeAddress, Row};

/// Row number -> column index -> non-empty cell.
type SheetCells = BTreeMap<Row, BTreeMap<u32, CellValue>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    Read,
    BatchRead,
    Write,
    Append,
    Clear,
}

impl OpKind {
    pub fn is_mutation(self) -> bool {
        matches!(self, OpKind::Write | OpKind::Append | OpKind::Clear)
    }
}

/// One served remote operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOp {
    pub kind: OpKind,
    pub address: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct InMemoryStore {
    sheets: BTreeMap<String, SheetCells>,

    /// Sheet -> head row. A write landing on the head row is followed by a
    /// blank row inserted at the head, pushing everything below down by one.
    #[serde(default)]
    head_insertions: BTreeMap<String, Row>,

    #[serde(skip)]
    journal: RefCell<Vec<StoreOp>>,

    #[serde(skip)]
    calls: Cell<usize>,

    #[serde(skip)]
    scheduled_failures: RefCell<BTreeSet<usize>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emulate newest-first insertion on `sheet`: after every write that
    /// starts on `head_row`, a blank row is inserted at `head_row`.
    pub fn with_head_insertion(mut self, sheet: impl Into<String>, head_row: Row) -> Self {
        self.head_insertions.insert(sheet.into(), head_row);
        self
    }

    pub fn head_insertion(&self, sheet: &str) -> Option<Row> {
        self.head_insertions.get(sheet).copied()
    }

    /// Operations served so far, in order.
    pub fn journal(&self) -> Vec<StoreOp> {
        self.journal.borrow().clone()
    }

    /// Number of mutating operations served so far.
    pub fn mutation_count(&self) -> usize {
        self.journal
            .borrow()
            .iter()
            .filter(|op| op.kind.is_mutation())
            .count()
    }

    /// Make the call `after` calls from now fail with a transient error.
    /// `fail_after(0)` fails the very next call.
    pub fn fail_after(&self, after: usize) {
        self.scheduled_failures
            .borrow_mut()
            .insert(self.calls.get() + after + 1);
    }

    /// Read a single cell directly, bypassing the journal.
    pub fn cell(&self, sheet: &str, column: Column, row: Row) -> CellValue {
        self.sheets
            .get(sheet)
            .and_then(|cells| cells.get(&row))
            .and_then(|cols| cols.get(&column.index()))
            .cloned()
            .unwrap_or_default()
    }

    fn begin(&self, kind: OpKind, address: String) -> Result<(), StoreError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);

        if self.scheduled_failures.borrow_mut().remove(&call) {
            return Err(StoreError::Transient(format!(
                "injected failure on call {call} ({kind:?} {address})"
            )));
        }

        self.journal.borrow_mut().push(StoreOp { kind, address });
        Ok(())
    }

    fn last_row(cells: &SheetCells) -> Row {
        cells.keys().next_back().copied().unwrap_or(0)
    }

    fn last_column(cells: &SheetCells) -> u32 {
        cells
            .values()
            .filter_map(|cols| cols.keys().next_back().copied())
            .max()
            .unwrap_or(0)
    }

    fn grid_at(&self, address: &RangeAddress) -> Grid {
        let cells = self.sheets.get(&address.sheet);
        let (first_col, first_row, last_col, last_row) = resolve(address, cells);
        let Some(cells) = cells else {
            return Vec::new();
        };

        let mut grid: Grid = Vec::new();
        for row in first_row..=last_row {
            let mut values: Vec<CellValue> = (first_col..=last_col)
                .map(|col| {
                    cells
                        .get(&row)
                        .and_then(|cols| cols.get(&col))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect();
            while values.last().is_some_and(CellValue::is_empty) {
                values.pop();
            }
            grid.push(values);
        }
        while grid.last().is_some_and(Vec::is_empty) {
            grid.pop();
        }
        grid
    }

    /// Store `rows` with their top-left cell at (`first_col`, `first_row`).
    /// Bounds are checked by the caller.
    fn put(&mut self, sheet: &str, first_col: u32, first_row: Row, rows: Grid) {
        let cells = self.sheets.entry(sheet.to_string()).or_default();
        for (r, values) in rows.into_iter().enumerate() {
            let row = first_row + r as Row;
            for (c, value) in values.into_iter().enumerate() {
                let col = first_col + c as u32;
                if value.is_empty() {
                    if let Some(cols) = cells.get_mut(&row) {
                        cols.remove(&col);
                    }
                } else {
                    cells.entry(row).or_default().insert(col, value);
                }
            }
        }
        cells.retain(|_, cols| !cols.is_empty());
    }

    fn insert_blank_row(&mut self, sheet: &str, at: Row) {
        let Some(cells) = self.sheets.get_mut(sheet) else {
            return;
        };
        let below = cells.split_off(&at);
        cells.extend(
            below
                .into_iter()
                .filter_map(|(row, cols)| Some((row.checked_add(1)?, cols))),
        );
        debug!(sheet, row = at, "inserted blank head row");
    }
}

/// Bounded view of an address against the current sheet extent.
fn resolve(address: &RangeAddress, cells: Option<&SheetCells>) -> (u32, Row, u32, Row) {
    let extent_row = cells.map_or(0, InMemoryStore::last_row);
    let extent_col = cells.map_or(0, InMemoryStore::last_column);

    match address.range {
        Some(CellRange {
            start_column,
            start_row,
            end_column,
            end_row,
        }) => (
            start_column.index(),
            start_row,
            end_column.index(),
            end_row.unwrap_or(extent_row),
        ),
        None => (1, 1, extent_col, extent_row),
    }
}

/// Top-left cell of `address` and how many rows and columns fit from there.
fn capacity(address: &RangeAddress) -> (u32, Row, u64, u64) {
    match address.range {
        Some(range) => {
            let end_row = range.end_row.unwrap_or(Row::MAX);
            let rows = u64::from(end_row.saturating_sub(range.start_row)) + 1;
            (range.start_column.index(), range.start_row, rows, u64::from(range.width()))
        }
        None => (1, 1, u64::from(Row::MAX), u64::from(u32::MAX)),
    }
}

fn check_fits(
    address: &RangeAddress,
    rows: &Grid,
    max_rows: u64,
    max_cols: u64,
) -> Result<(), StoreError> {
    let height = rows.len();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if height as u64 > max_rows || width as u64 > max_cols {
        return Err(StoreError::GridExceedsRange {
            address: address.to_string(),
            rows: height,
            columns: width,
        });
    }
    Ok(())
}

impl TabularStore for InMemoryStore {
    fn read(&self, address: &RangeAddress) -> Result<Grid, StoreError> {
        self.begin(OpKind::Read, address.to_string())?;
        Ok(self.grid_at(address))
    }

    fn read_batch(&self, addresses: &[RangeAddress]) -> Result<Vec<Grid>, StoreError> {
        let joined = addresses
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.begin(OpKind::BatchRead, joined)?;
        Ok(addresses.iter().map(|address| self.grid_at(address)).collect())
    }

    fn write(&mut self, address: &RangeAddress, rows: Grid) -> Result<(), StoreError> {
        let (first_col, first_row, max_rows, max_cols) = capacity(address);
        check_fits(address, &rows, max_rows, max_cols)?;

        self.begin(OpKind::Write, address.to_string())?;

        let height = rows.len();
        self.put(&address.sheet, first_col, first_row, rows);

        if height > 0 && self.head_insertion(&address.sheet) == Some(first_row) {
            self.insert_blank_row(&address.sheet, first_row);
        }

        Ok(())
    }

    fn append(&mut self, address: &RangeAddress, rows: Grid) -> Result<RangeAddress, StoreError> {
        let (first_col, first_row, _, max_cols) = capacity(address);
        let last_col = first_col.saturating_add((max_cols - 1) as u32);

        let last_filled = self.sheets.get(&address.sheet).and_then(|cells| {
            cells
                .iter()
                .filter(|(row, cols)| {
                    **row >= first_row
                        && cols.keys().any(|col| (first_col..=last_col).contains(col))
                })
                .map(|(row, _)| *row)
                .last()
        });
        let start = match last_filled {
            Some(row) => row.checked_add(1).ok_or(AddressError::RowOverflow)?,
            None => first_row,
        };

        let room = u64::from(Row::MAX - start) + 1;
        check_fits(address, &rows, room, max_cols)?;

        let height = rows.len().max(1) as u32;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1) as u32;
        let filled = RangeAddress::range(
            address.sheet.as_str(),
            Column::new(first_col)?,
            start,
            Column::new(first_col + width - 1)?,
            Some(start + height - 1),
        )?;

        self.begin(OpKind::Append, address.to_string())?;
        self.put(&address.sheet, first_col, start, rows);
        debug!(%filled, "appended rows");

        Ok(filled)
    }

    fn clear(&mut self, address: &RangeAddress) -> Result<(), StoreError> {
        self.begin(OpKind::Clear, address.to_string())?;

        let Some(cells) = self.sheets.get_mut(&address.sheet) else {
            return Ok(());
        };
        match address.range {
            Some(range) => {
                for (row, cols) in cells.iter_mut() {
                    cols.retain(|col, _| {
                        !Column::new(*col).is_ok_and(|column| range.contains(column, *row))
                    });
                }
                cells.retain(|_, cols| !cols.is_empty());
            }
            None => cells.clear(),
        }

        Ok(())
    }
}
