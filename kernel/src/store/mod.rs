// Tabular Store Abstraction
//
// Defines the contract of the externally hosted tabular store that holds
// all seat state. Rows and columns are addressed by A1 ranges; there are no
// transactions, locks or compare-and-set primitives.

use serde::{Deserialize, Serialize};

use crate::address::{AddressError, RangeAddress};

pub mod memory;

pub use memory::{InMemoryStore, OpKind, StoreOp};

/// A single cell as returned by an unformatted read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.is_empty(),
            CellValue::Number(_) => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Positive whole number, as used for seat numbers and row indices.
    pub fn as_index(&self) -> Option<u32> {
        let n = self.as_f64()?;
        let whole = n.fract() == 0.0 && n >= 1.0 && n <= f64::from(u32::MAX);
        whole.then_some(n as u32)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        CellValue::Number(f64::from(value))
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

/// Rows-major block of cells.
pub type Grid = Vec<Vec<CellValue>>;

/// Errors surfaced by a tabular store.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error("address error: {0}")]
    Address(#[from] AddressError),

    #[error("grid of {rows}x{columns} does not fit `{address}`")]
    GridExceedsRange {
        address: String,
        rows: usize,
        columns: usize,
    },

    #[error("transient store failure: {0}")]
    Transient(String),
}

impl StoreError {
    /// Remote failures that a caller may retry as a whole operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// Range-addressed tabular store.
///
/// Every call is an independent round trip. Implementations make no
/// isolation guarantee between calls and offer no conditional writes.
///
/// Reads follow the unformatted-value convention of hosted spreadsheets:
/// - trailing empty rows are omitted
/// - trailing empty cells within a row are omitted
/// - interior empty rows come back as empty vectors
pub trait TabularStore: Send {
    /// Read the addressed cells.
    fn read(&self, address: &RangeAddress) -> Result<Grid, StoreError>;

    /// Overwrite the addressed cells, starting at the range's top-left cell.
    ///
    /// `CellValue::Empty` clears the target cell. A grid larger than a
    /// bounded range is rejected.
    fn write(&mut self, address: &RangeAddress, rows: Grid) -> Result<(), StoreError>;

    /// Empty the addressed cells without removing rows or columns.
    fn clear(&mut self, address: &RangeAddress) -> Result<(), StoreError>;

    /// Write `rows` below the last non-empty row of the addressed columns and
    /// return the range that was filled.
    fn append(&mut self, address: &RangeAddress, rows: Grid) -> Result<RangeAddress, StoreError>;

    /// Read several ranges. Stores that support it serve this in one round
    /// trip; the default issues one read per range.
    fn read_batch(&self, addresses: &[RangeAddress]) -> Result<Vec<Grid>, StoreError> {
        addresses.iter().map(|address| self.read(address)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_serialize_untagged() {
        let row = vec![
            CellValue::Number(1.5),
            CellValue::Empty,
            CellValue::from(3u32),
            CellValue::from("a@x.com"),
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[1.5,null,3.0,"a@x.com"]"#);

        let back: Vec<CellValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn only_positive_whole_numbers_are_indices() {
        assert_eq!(CellValue::Number(4.0).as_index(), Some(4));
        assert_eq!(CellValue::Number(4.5).as_index(), None);
        assert_eq!(CellValue::Number(0.0).as_index(), None);
        assert_eq!(CellValue::from("4").as_index(), None);
    }

    #[test]
    fn empty_text_counts_as_empty() {
        assert!(CellValue::Text(String::new()).is_empty());
        assert!(CellValue::from(None::<f64>).is_empty());
        assert!(!CellValue::Number(0.0).is_empty());
    }
}
