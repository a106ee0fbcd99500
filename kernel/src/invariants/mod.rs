// Invariant Framework
//
// Invariants are pure rules over a snapshot of the pointer table and the
// ledger. Nothing enforces them on the store itself, so they are checked
// after the fact to detect a pointer table that has drifted from the ledger.

use std::collections::BTreeMap;

use crate::ledger::{LedgerEntry, RowIndex};

/// Pointer table and ledger contents read at one point in time.
#[derive(Debug, Clone, Default)]
pub struct OccupancySnapshot {
    /// Pointer of seat `i + 1` at index `i`.
    pub pointers: Vec<Option<RowIndex>>,

    /// Parsed ledger rows, newest first.
    pub entries: Vec<(RowIndex, LedgerEntry)>,
}

impl OccupancySnapshot {
    pub fn pointer(&self, seat: u32) -> Option<RowIndex> {
        let index = seat.checked_sub(1)? as usize;
        self.pointers.get(index).copied().flatten()
    }

    pub fn entry_at(&self, row: RowIndex) -> Option<&LedgerEntry> {
        self.entries
            .iter()
            .find(|(at, _)| *at == row)
            .map(|(_, entry)| entry)
    }

    /// Open entries grouped by seat.
    pub fn open_rows_by_seat(&self) -> BTreeMap<u32, Vec<RowIndex>> {
        let mut open: BTreeMap<u32, Vec<RowIndex>> = BTreeMap::new();
        for (row, entry) in &self.entries {
            if entry.is_open() {
                open.entry(entry.seat_number).or_default().push(*row);
            }
        }
        open
    }
}

/// Result of invariant evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantResult {
    Pass,
    Fail(String),
}

/// Trait implemented by all invariants.
///
/// Invariants must be:
/// - Pure
/// - Deterministic
/// - Side-effect free
pub trait Invariant: Send + Sync {
    fn name(&self) -> &'static str;

    fn validate(&self, snapshot: &OccupancySnapshot) -> InvariantResult;
}

/// Every present pointer names an open entry for the same seat.
pub struct PointerResolvesToOpenEntry;

impl Invariant for PointerResolvesToOpenEntry {
    fn name(&self) -> &'static str {
        "pointer-resolves-to-open-entry"
    }

    fn validate(&self, snapshot: &OccupancySnapshot) -> InvariantResult {
        for (seat, pointer) in (1u32..).zip(&snapshot.pointers) {
            let Some(row) = *pointer else { continue };
            match snapshot.entry_at(row) {
                None => {
                    return InvariantResult::Fail(format!("seat {seat} points at empty row {row}"))
                }
                Some(entry) if entry.seat_number != seat => {
                    return InvariantResult::Fail(format!(
                        "seat {seat} points at row {row} which belongs to seat {}",
                        entry.seat_number
                    ))
                }
                Some(entry) if !entry.is_open() => {
                    return InvariantResult::Fail(format!(
                        "seat {seat} points at closed session in row {row}"
                    ))
                }
                Some(_) => {}
            }
        }
        InvariantResult::Pass
    }
}

/// Every open entry is referenced by its seat's pointer.
pub struct OpenEntryIsReferenced;

impl Invariant for OpenEntryIsReferenced {
    fn name(&self) -> &'static str {
        "open-entry-is-referenced"
    }

    fn validate(&self, snapshot: &OccupancySnapshot) -> InvariantResult {
        for (row, entry) in &snapshot.entries {
            if entry.is_open() && snapshot.pointer(entry.seat_number) != Some(*row) {
                return InvariantResult::Fail(format!(
                    "open session for seat {} in row {row} is not referenced",
                    entry.seat_number
                ));
            }
        }
        InvariantResult::Pass
    }
}

/// A seat has at most one open session.
pub struct SingleOpenEntryPerSeat;

impl Invariant for SingleOpenEntryPerSeat {
    fn name(&self) -> &'static str {
        "single-open-entry-per-seat"
    }

    fn validate(&self, snapshot: &OccupancySnapshot) -> InvariantResult {
        for (seat, rows) in snapshot.open_rows_by_seat() {
            if rows.len() > 1 {
                return InvariantResult::Fail(format!(
                    "seat {seat} has open sessions in rows {rows:?}"
                ));
            }
        }
        InvariantResult::Pass
    }
}

/// Invariant engine that evaluates a set of invariants.
#[derive(Default)]
pub struct InvariantEngine {
    invariants: Vec<Box<dyn Invariant>>,
}

impl InvariantEngine {
    /// Create an engine with no invariants.
    pub fn new() -> Self {
        Self {
            invariants: Vec::new(),
        }
    }

    /// Engine preloaded with the occupancy rules.
    pub fn with_occupancy_rules() -> Self {
        let mut engine = Self::new();
        engine.register(SingleOpenEntryPerSeat);
        engine.register(PointerResolvesToOpenEntry);
        engine.register(OpenEntryIsReferenced);
        engine
    }

    /// Register an invariant.
    pub fn register<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }

    /// Evaluate all invariants.
    ///
    /// Stops at the first failure.
    pub fn evaluate(&self, snapshot: &OccupancySnapshot) -> Result<(), InvariantViolation> {
        for invariant in &self.invariants {
            match invariant.validate(snapshot) {
                InvariantResult::Pass => continue,
                InvariantResult::Fail(reason) => {
                    return Err(InvariantViolation {
                        invariant: invariant.name(),
                        reason,
                    })
                }
            }
        }
        Ok(())
    }
}

/// Returned when an invariant is violated.
#[derive(Debug, thiserror::Error)]
#[error("invariant `{invariant}` violated: {reason}")]
pub struct InvariantViolation {
    pub invariant: &'static str,
    pub reason: String,
}
