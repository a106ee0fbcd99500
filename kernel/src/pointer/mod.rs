// Seat Pointer Table
//
// One cell per seat holding the ledger row of that seat's active session.
// An empty cell means the seat is free.

use serde::Serialize;
use tracing::debug;

use crate::address::{AddressError, RangeAddress, Row};
use crate::config::PointerLayout;
use crate::ledger::RowIndex;
use crate::store::{CellValue, Grid, StoreError, TabularStore};

#[derive(Debug, thiserror::Error)]
pub enum PointerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("malformed pointer at `{address}`: {value:?}")]
    Malformed { address: String, value: CellValue },
}

impl From<AddressError> for PointerError {
    fn from(value: AddressError) -> Self {
        StoreError::from(value).into()
    }
}

/// Occupancy of one seat as recorded in the pointer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeatStatus {
    pub seat: u32,
    pub row: Option<RowIndex>,
}

impl SeatStatus {
    pub fn is_occupied(&self) -> bool {
        self.row.is_some()
    }
}

/// Pack a pointer column into per-seat statuses, seat 1 first.
pub fn statuses(pointers: &[Option<RowIndex>]) -> Vec<SeatStatus> {
    pointers
        .iter()
        .zip(1u32..)
        .map(|(row, seat)| SeatStatus { seat, row: *row })
        .collect()
}

#[derive(Debug, Clone)]
pub struct PointerTable {
    layout: PointerLayout,
    seat_count: u32,
}

impl PointerTable {
    pub fn new(layout: PointerLayout, seat_count: u32) -> Self {
        Self { layout, seat_count }
    }

    pub fn seat_count(&self) -> u32 {
        self.seat_count
    }

    pub fn contains(&self, seat: u32) -> bool {
        (1..=self.seat_count).contains(&seat)
    }

    fn row_of(&self, seat: u32) -> Result<Row, AddressError> {
        self.layout
            .first_row
            .checked_add(seat - 1)
            .ok_or(AddressError::RowOverflow)
    }

    /// Single cell holding `seat`'s pointer: `current!B{seat+1}` by default.
    pub fn cell_address(&self, seat: u32) -> Result<RangeAddress, AddressError> {
        if seat == 0 {
            return Err(AddressError::ZeroRow);
        }
        RangeAddress::cell(self.layout.sheet.as_str(), self.layout.column, self.row_of(seat)?)
    }

    /// Contiguous column covering every seat: `current!B2:B{N+1}` by default.
    pub fn column_address(&self) -> Result<RangeAddress, AddressError> {
        RangeAddress::range(
            self.layout.sheet.as_str(),
            self.layout.column,
            self.layout.first_row,
            self.layout.column,
            Some(self.row_of(self.seat_count.max(1))?),
        )
    }

    fn parse(address: &RangeAddress, value: &CellValue) -> Result<Option<RowIndex>, PointerError> {
        if value.is_empty() {
            return Ok(None);
        }
        value.as_index().map(Some).ok_or_else(|| PointerError::Malformed {
            address: address.to_string(),
            value: value.clone(),
        })
    }

    pub fn get<S: TabularStore>(
        &self,
        store: &S,
        seat: u32,
    ) -> Result<Option<RowIndex>, PointerError> {
        let address = self.cell_address(seat)?;
        let grid = store.read(&address)?;
        let value = grid
            .first()
            .and_then(|row| row.first())
            .cloned()
            .unwrap_or_default();
        Self::parse(&address, &value)
    }

    pub fn set<S: TabularStore>(
        &self,
        store: &mut S,
        seat: u32,
        row: RowIndex,
    ) -> Result<(), PointerError> {
        let address = self.cell_address(seat)?;
        debug!(%address, row, "setting pointer");
        store.write(&address, vec![vec![row.into()]])?;
        Ok(())
    }

    pub fn clear<S: TabularStore>(&self, store: &mut S, seat: u32) -> Result<(), PointerError> {
        let address = self.cell_address(seat)?;
        debug!(%address, "clearing pointer");
        store.clear(&address)?;
        Ok(())
    }

    /// Every seat's pointer in one range read, seat 1 first.
    pub fn read_all<S: TabularStore>(
        &self,
        store: &S,
    ) -> Result<Vec<Option<RowIndex>>, PointerError> {
        let address = self.column_address()?;
        let grid = store.read(&address)?;
        self.parse_column(&address, &grid)
    }

    /// Decode a grid read from [`PointerTable::column_address`].
    pub fn parse_column(
        &self,
        address: &RangeAddress,
        grid: &Grid,
    ) -> Result<Vec<Option<RowIndex>>, PointerError> {
        let mut pointers = Vec::with_capacity(self.seat_count as usize);
        for seat in 0..self.seat_count as usize {
            let value = grid
                .get(seat)
                .and_then(|row| row.first())
                .cloned()
                .unwrap_or_default();
            pointers.push(Self::parse(address, &value)?);
        }
        Ok(pointers)
    }

    /// Rewrite the whole column in one batch. Missing trailing seats are
    /// left untouched.
    pub fn write_all<S: TabularStore>(
        &self,
        store: &mut S,
        pointers: &[Option<RowIndex>],
    ) -> Result<(), PointerError> {
        let address = self.column_address()?;
        let grid = pointers.iter().map(|row| vec![CellValue::from(*row)]).collect();
        debug!(%address, seats = pointers.len(), "rewriting pointer column");
        store.write(&address, grid)?;
        Ok(())
    }
}
