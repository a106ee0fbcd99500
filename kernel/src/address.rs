// Range Addressing
//
// A1-style addresses for the tabular store: a sheet name and an optional
// rectangular cell range. Single cells are 1x1 ranges and the end row of a
// range may be left open (`sheet!C2:F`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 1-based row number inside a sheet.
pub type Row = u32;

/// Errors produced while building or parsing an address.
///
/// These are programming errors in range construction and are never retried.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("sheet name is empty")]
    EmptySheet,

    #[error("invalid column `{0}`")]
    InvalidColumn(String),

    #[error("row numbers start at 1")]
    ZeroRow,

    #[error("malformed cell reference `{0}`")]
    MalformedCell(String),

    #[error("malformed range address `{0}`")]
    MalformedAddress(String),

    #[error("range `{0}` ends before it starts")]
    InvertedRange(String),

    #[error("row number out of range")]
    RowOverflow,

    #[error("column index out of range")]
    ColumnOverflow,
}

/// 1-based column index, displayed as letters (`A`, `Z`, `AA`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Column(u32);

impl Column {
    pub fn new(index: u32) -> Result<Self, AddressError> {
        if index == 0 {
            return Err(AddressError::InvalidColumn(index.to_string()));
        }
        Ok(Self(index))
    }

    /// Column from an index known at compile time.
    pub const fn fixed(index: u32) -> Self {
        assert!(index > 0, "columns are 1-based");
        Self(index)
    }

    /// Parse bijective base-26 column letters.
    pub fn from_letters(letters: &str) -> Result<Self, AddressError> {
        if letters.is_empty() {
            return Err(AddressError::InvalidColumn(letters.into()));
        }

        let mut index: u32 = 0;
        for ch in letters.chars() {
            if !ch.is_ascii_alphabetic() {
                return Err(AddressError::InvalidColumn(letters.into()));
            }
            let digit = ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
            index = index
                .checked_mul(26)
                .and_then(|i| i.checked_add(digit))
                .ok_or_else(|| AddressError::InvalidColumn(letters.into()))?;
        }

        Ok(Self(index))
    }

    pub fn index(self) -> u32 {
        self.0
    }

    /// Column `n` places to the right of this one.
    pub fn offset(self, n: u32) -> Result<Self, AddressError> {
        self.0.checked_add(n).map(Self).ok_or(AddressError::ColumnOverflow)
    }

    pub fn letters(self) -> String {
        let mut n = self.0;
        let mut out = Vec::new();
        while n > 0 {
            n -= 1;
            out.push(b'A' + (n % 26) as u8);
            n /= 26;
        }
        out.reverse();
        String::from_utf8_lossy(&out).into_owned()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.letters())
    }
}

impl TryFrom<String> for Column {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Column::from_letters(&value)
    }
}

impl From<Column> for String {
    fn from(value: Column) -> Self {
        value.letters()
    }
}

/// Rectangular range of cells. `end_row == None` means "to the last row".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start_column: Column,
    pub start_row: Row,
    pub end_column: Column,
    pub end_row: Option<Row>,
}

impl CellRange {
    pub fn new(
        start_column: Column,
        start_row: Row,
        end_column: Column,
        end_row: Option<Row>,
    ) -> Result<Self, AddressError> {
        if start_row == 0 || end_row == Some(0) {
            return Err(AddressError::ZeroRow);
        }

        let range = Self {
            start_column,
            start_row,
            end_column,
            end_row,
        };

        let inverted_rows = matches!(end_row, Some(end) if end < start_row);
        if end_column < start_column || inverted_rows {
            return Err(AddressError::InvertedRange(range.to_string()));
        }

        Ok(range)
    }

    pub fn cell(column: Column, row: Row) -> Result<Self, AddressError> {
        Self::new(column, row, column, Some(row))
    }

    /// Number of columns spanned.
    pub fn width(&self) -> u32 {
        self.end_column.index().saturating_sub(self.start_column.index()) + 1
    }

    pub fn contains(&self, column: Column, row: Row) -> bool {
        column >= self.start_column
            && column <= self.end_column
            && row >= self.start_row
            && self.end_row.map_or(true, |end| row <= end)
    }

    fn is_single_cell(&self) -> bool {
        self.start_column == self.end_column && self.end_row == Some(self.start_row)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.start_column, self.start_row)?;
        if self.is_single_cell() {
            return Ok(());
        }
        write!(f, ":{}", self.end_column)?;
        if let Some(end) = self.end_row {
            write!(f, "{end}")?;
        }
        Ok(())
    }
}

/// A sheet name plus an optional cell range within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeAddress {
    pub sheet: String,
    pub range: Option<CellRange>,
}

impl RangeAddress {
    /// Address covering a whole sheet.
    pub fn sheet(sheet: impl Into<String>) -> Result<Self, AddressError> {
        let sheet = sheet.into();
        if sheet.is_empty() {
            return Err(AddressError::EmptySheet);
        }
        Ok(Self { sheet, range: None })
    }

    pub fn cell(sheet: impl Into<String>, column: Column, row: Row) -> Result<Self, AddressError> {
        let mut address = Self::sheet(sheet)?;
        address.range = Some(CellRange::cell(column, row)?);
        Ok(address)
    }

    pub fn range(
        sheet: impl Into<String>,
        start_column: Column,
        start_row: Row,
        end_column: Column,
        end_row: Option<Row>,
    ) -> Result<Self, AddressError> {
        let mut address = Self::sheet(sheet)?;
        address.range = Some(CellRange::new(start_column, start_row, end_column, end_row)?);
        Ok(address)
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plain = self
            .sheet
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if plain {
            f.write_str(&self.sheet)?;
        } else {
            write!(f, "'{}'", self.sheet.replace('\'', "''"))?;
        }

        match &self.range {
            Some(range) => write!(f, "!{range}"),
            None => Ok(()),
        }
    }
}

impl FromStr for RangeAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sheet, rest) = split_sheet(s)?;

        let Some(rest) = rest else {
            return RangeAddress::sheet(sheet);
        };

        let (start, end) = match rest.split_once(':') {
            Some((start, end)) => (start, Some(end)),
            None => (rest, None),
        };

        let (start_column, start_row) = parse_cell(start)?;
        let start_row = start_row.ok_or_else(|| AddressError::MalformedCell(start.into()))?;

        match end {
            None => RangeAddress::cell(sheet, start_column, start_row),
            Some(end) => {
                let (end_column, end_row) = parse_cell(end)?;
                RangeAddress::range(sheet, start_column, start_row, end_column, end_row)
            }
        }
    }
}

/// Split `sheet!range` into its parts, unquoting `'quoted ''names'''`.
fn split_sheet(s: &str) -> Result<(String, Option<&str>), AddressError> {
    if let Some(quoted) = s.strip_prefix('\'') {
        let mut name = String::new();
        let mut chars = quoted.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c != '\'' {
                name.push(c);
                continue;
            }
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                name.push('\'');
                continue;
            }
            let rest = &quoted[i + 1..];
            return match rest.strip_prefix('!') {
                Some(range) => Ok((name, Some(range))),
                None if rest.is_empty() => Ok((name, None)),
                None => Err(AddressError::MalformedAddress(s.into())),
            };
        }
        return Err(AddressError::MalformedAddress(s.into()));
    }

    match s.split_once('!') {
        Some((sheet, range)) => Ok((sheet.to_string(), Some(range))),
        None => Ok((s.to_string(), None)),
    }
}

/// Parse `C2` or `C` into a column and optional row.
fn parse_cell(s: &str) -> Result<(Column, Option<Row>), AddressError> {
    let split = s
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(s.len());
    let (letters, digits) = s.split_at(split);

    if letters.is_empty() {
        return Err(AddressError::MalformedCell(s.into()));
    }
    let column = Column::from_letters(letters)?;

    if digits.is_empty() {
        return Ok((column, None));
    }
    let row: Row = digits
        .parse()
        .map_err(|_| AddressError::MalformedCell(s.into()))?;
    if row == 0 {
        return Err(AddressError::ZeroRow);
    }

    Ok((column, Some(row)))
}
