// Seat Booker
//
// Composes the ledger and the pointer table into the three public actions:
// take a seat, return a seat, and ask whether a seat is in use. Each action
// is a sequence of independent store round trips; nothing is rolled back
// when a later step fails.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{BookerConfig, ConfigError, SettleStrategy};
use crate::invariants::{InvariantEngine, InvariantViolation, OccupancySnapshot};
use crate::ledger::{truncate_millis, Ledger, LedgerEntry, LedgerError, RowIndex};
use crate::pointer::{statuses, PointerError, PointerTable, SeatStatus};
use crate::replay::replay_pointers;
use crate::store::{StoreError, TabularStore};

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("seat {seat} is already occupied (ledger row {row})")]
    SeatOccupied { seat: u32, row: RowIndex },

    #[error("seat {seat} is not occupied")]
    SeatNotOccupied { seat: u32 },

    #[error("seat {seat} is outside 1..={max}")]
    InvalidSeat { seat: u32, max: u32 },

    #[error("occupant identifier is empty")]
    EmptyOccupant,

    #[error("ledger row {row} is inconsistent: {reason}")]
    Consistency { row: RowIndex, reason: String },

    #[error("ledger entry not visible after {waited_ms}ms")]
    SettleTimeout { waited_ms: u64 },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("pointer table error: {0}")]
    Pointer(#[from] PointerError),

    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl BookingError {
    /// Remote failures; the whole operation may be retried.
    pub fn is_transient(&self) -> bool {
        let store = match self {
            BookingError::Ledger(LedgerError::Store(err)) => err,
            BookingError::Pointer(PointerError::Store(err)) => err,
            _ => return false,
        };
        StoreError::is_transient(store)
    }
}

/// Seat-occupancy orchestrator over a tabular store.
///
/// Mutating actions take `&mut self`: one `Booker` is the single writer
/// for its store within a process. Separate processes sharing a store are
/// not serialized.
pub struct Booker<S: TabularStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    config: BookerConfig,
    ledger: Ledger,
    pointers: PointerTable,
    invariants: InvariantEngine,
}

impl<S: TabularStore> Booker<S, SystemClock> {
    pub fn new(store: S, config: BookerConfig) -> Result<Self, ConfigError> {
        Self::with_clock(store, SystemClock, config)
    }
}

impl<S: TabularStore, C: Clock> Booker<S, C> {
    pub fn with_clock(store: S, clock: C, config: BookerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            ledger: Ledger::new(config.ledger.clone()),
            pointers: PointerTable::new(config.pointers.clone(), config.seat_count),
            invariants: InvariantEngine::with_occupancy_rules(),
            store,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &BookerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn check_seat(&self, seat: u32) -> Result<(), BookingError> {
        if self.pointers.contains(seat) {
            Ok(())
        } else {
            Err(BookingError::InvalidSeat {
                seat,
                max: self.pointers.seat_count(),
            })
        }
    }

    /// Ledger row of the seat's active session, if any.
    pub fn seat_is_in_use(&self, seat: u32) -> Result<Option<RowIndex>, BookingError> {
        self.check_seat(seat)?;
        Ok(self.pointers.get(&self.store, seat)?)
    }

    /// Claim a free seat and open a ledger session for `occupant`.
    ///
    /// The new seat's pointer ends up at `head_row + 1` and every other
    /// present pointer moves down by one.
    pub fn take_a_seat(&mut self, seat: u32, occupant: &str) -> Result<(), BookingError> {
        self.check_seat(seat)?;
        if occupant.is_empty() {
            return Err(BookingError::EmptyOccupant);
        }

        if let Some(row) = self.seat_is_in_use(seat)? {
            debug!(seat, row, "seat already occupied");
            return Err(BookingError::SeatOccupied { seat, row });
        }

        let entry = LedgerEntry::open(self.clock.now(), seat, occupant);
        self.ledger.write_head(&mut self.store, &entry)?;

        self.settle(&entry)?;

        self.pointers.set(&mut self.store, seat, self.ledger.head_row())?;
        let shifted = self.shift_pointers()?;

        let row = shifted.get((seat - 1) as usize).copied().flatten();
        info!(seat, occupant, row, "seat taken");
        Ok(())
    }

    /// Release an occupied seat and stamp the end of its session.
    pub fn return_a_seat(&mut self, seat: u32) -> Result<(), BookingError> {
        self.check_seat(seat)?;

        let Some(row) = self.seat_is_in_use(seat)? else {
            debug!(seat, "seat not occupied");
            return Err(BookingError::SeatNotOccupied { seat });
        };

        if self.config.verify_ledger_rows {
            self.verify_row(seat, row)?;
        }

        let end_time = truncate_millis(self.clock.now());
        self.ledger.stamp_end(&mut self.store, row, end_time)?;
        self.pointers.clear(&mut self.store, seat)?;

        info!(seat, row, "seat returned");
        Ok(())
    }

    /// Every seat with its pointer, seat 1 first.
    ///
    /// Only the pointer column is read; header rows and any side columns of
    /// the pointer sheet are not part of the result.
    pub fn current_state(&self) -> Result<Vec<SeatStatus>, BookingError> {
        let pointers = self.pointers.read_all(&self.store)?;
        Ok(statuses(&pointers))
    }

    /// Parsed ledger rows, newest first.
    pub fn ledger_entries(&self) -> Result<Vec<(RowIndex, LedgerEntry)>, BookingError> {
        Ok(self.ledger.read_all(&self.store)?)
    }

    /// Pointer column and ledger, fetched in one batched read.
    pub fn snapshot(&self) -> Result<OccupancySnapshot, BookingError> {
        let column = self.pointers.column_address().map_err(PointerError::from)?;
        let rows = self.ledger.all_address().map_err(LedgerError::from)?;

        let grids = self
            .store
            .read_batch(&[column.clone(), rows])
            .map_err(LedgerError::from)?;
        let [pointer_grid, ledger_grid] = grids.as_slice() else {
            return Err(LedgerError::Malformed {
                address: column.to_string(),
                reason: format!("batch read returned {} ranges, expected 2", grids.len()),
            }
            .into());
        };

        Ok(OccupancySnapshot {
            pointers: self.pointers.parse_column(&column, pointer_grid)?,
            entries: self.ledger.parse_rows(ledger_grid),
        })
    }

    /// Check the pointer table against the ledger.
    pub fn audit(&self) -> Result<(), BookingError> {
        let snapshot = self.snapshot()?;
        self.invariants.evaluate(&snapshot)?;
        debug!(
            seats = snapshot.pointers.len(),
            entries = snapshot.entries.len(),
            "audit passed"
        );
        Ok(())
    }

    /// Rebuild the pointer table from the ledger and write it back in one
    /// batch.
    pub fn reconcile(&mut self) -> Result<Vec<SeatStatus>, BookingError> {
        let entries = self.ledger.read_all(&self.store)?;
        let outcome = replay_pointers(&entries, self.pointers.seat_count());

        for (seat, rows) in &outcome.superseded {
            warn!(seat, ?rows, "seat has several open sessions; keeping the newest");
        }
        for row in &outcome.out_of_range {
            warn!(row, "open session for a seat outside the pool");
        }

        self.pointers.write_all(&mut self.store, &outcome.pointers)?;
        info!(
            occupied = outcome.pointers.iter().flatten().count(),
            "pointer table rebuilt from ledger"
        );
        Ok(statuses(&outcome.pointers))
    }

    /// Increment every present pointer and write the column back.
    fn shift_pointers(&mut self) -> Result<Vec<Option<RowIndex>>, BookingError> {
        let current = self.pointers.read_all(&self.store)?;

        let mut shifted = Vec::with_capacity(current.len());
        for (seat, pointer) in (1u32..).zip(current) {
            let next = match pointer {
                None => None,
                Some(row) => Some(row.checked_add(1).ok_or_else(|| {
                    warn!(seat, row, "pointer cannot move past the last row");
                    BookingError::Consistency {
                        row,
                        reason: format!("pointer of seat {seat} cannot move past the last row"),
                    }
                })?),
            };
            shifted.push(next);
        }

        self.pointers.write_all(&mut self.store, &shifted)?;
        Ok(shifted)
    }

    fn settle(&self, entry: &LedgerEntry) -> Result<(), BookingError> {
        match self.config.settle {
            SettleStrategy::Fixed { millis } => {
                if millis > 0 {
                    thread::sleep(Duration::from_millis(millis));
                }
                Ok(())
            }
            SettleStrategy::Confirm {
                deadline_millis,
                poll_millis,
            } => {
                let started = Instant::now();
                let deadline = Duration::from_millis(deadline_millis);
                loop {
                    if self.ledger.entry_visible(&self.store, entry)? {
                        return Ok(());
                    }
                    if started.elapsed() >= deadline {
                        let waited_ms = started.elapsed().as_millis() as u64;
                        warn!(
                            seat = entry.seat_number,
                            waited_ms,
                            "ledger write not confirmed"
                        );
                        return Err(BookingError::SettleTimeout { waited_ms });
                    }
                    thread::sleep(Duration::from_millis(poll_millis));
                }
            }
        }
    }

    fn verify_row(&self, seat: u32, row: RowIndex) -> Result<(), BookingError> {
        let reason = match self.ledger.read_row(&self.store, row)? {
            None => "row is blank".to_string(),
            Some(entry) if entry.seat_number != seat => {
                format!("row belongs to seat {}", entry.seat_number)
            }
            Some(entry) if !entry.is_open() => "session already ended".to_string(),
            Some(_) => return Ok(()),
        };
        warn!(seat, row, %reason, "pointer does not resolve to an open session");
        Err(BookingError::Consistency { row, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::RangeAddress;
    use crate::clock::ManualClock;
    use crate::store::{CellValue, Grid, InMemoryStore, OpKind};
    use chrono::{DateTime, Duration as ChronoDuration, Utc};

    const HEAD_ROW: RowIndex = 2;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn config() -> BookerConfig {
        BookerConfig {
            seat_count: 10,
            settle: SettleStrategy::Fixed { millis: 0 },
            ..BookerConfig::default_config()
        }
    }

    fn booker(store: InMemoryStore) -> (Booker<InMemoryStore, ManualClock>, ManualClock) {
        let clock = ManualClock::new(t0());
        let booker = Booker::with_clock(store, clock.clone(), config()).unwrap();
        (booker, clock)
    }

    fn shifting_store() -> InMemoryStore {
        InMemoryStore::new().with_head_insertion("sheet", HEAD_ROW)
    }

    fn ledger_row(
        booker: &Booker<InMemoryStore, ManualClock>,
        row: RowIndex,
    ) -> Option<LedgerEntry> {
        booker.ledger.read_row(booker.store(), row).unwrap()
    }

    #[test]
    fn scenario_a_first_take_on_empty_store() {
        let (mut booker, _) = booker(InMemoryStore::new());

        booker.take_a_seat(3, "a@x.com").unwrap();

        assert_eq!(booker.seat_is_in_use(3).unwrap(), Some(HEAD_ROW + 1));
        assert_eq!(
            ledger_row(&booker, HEAD_ROW),
            Some(LedgerEntry {
                start_time: t0(),
                end_time: None,
                seat_number: 3,
                occupant: "a@x.com".into(),
            })
        );
    }

    #[test]
    fn take_issues_the_documented_round_trips() {
        let (mut booker, _) = booker(InMemoryStore::new());

        booker.take_a_seat(3, "a@x.com").unwrap();

        let ops: Vec<_> = booker
            .store()
            .journal()
            .into_iter()
            .map(|op| (op.kind, op.address))
            .collect();
        assert_eq!(
            ops,
            vec![
                (OpKind::Read, "current!B4".to_string()),
                (OpKind::Write, "sheet!C2:F2".to_string()),
                (OpKind::Write, "current!B4".to_string()),
                (OpKind::Read, "current!B2:B11".to_string()),
                (OpKind::Write, "current!B2:B11".to_string()),
            ]
        );
    }

    #[test]
    fn scenario_b_second_take_shifts_first_pointer() {
        let (mut booker, _) = booker(InMemoryStore::new());

        booker.take_a_seat(3, "a@x.com").unwrap();
        booker.take_a_seat(5, "b@x.com").unwrap();

        assert_eq!(booker.seat_is_in_use(5).unwrap(), Some(HEAD_ROW + 1));
        assert_eq!(booker.seat_is_in_use(3).unwrap(), Some(HEAD_ROW + 2));
    }

    #[test]
    fn scenario_c_return_stamps_prior_row_and_clears_pointer() {
        let (mut booker, clock) = booker(InMemoryStore::new());
        booker.take_a_seat(3, "a@x.com").unwrap();
        booker.take_a_seat(5, "b@x.com").unwrap();
        let prior = booker.seat_is_in_use(3).unwrap().unwrap();

        clock.advance(ChronoDuration::minutes(45));
        booker.return_a_seat(3).unwrap();

        let t2 = t0() + ChronoDuration::minutes(45);
        let end_cell = booker
            .store()
            .read(&booker.ledger.end_time_address(prior).unwrap())
            .unwrap();
        assert_eq!(end_cell, vec![vec![CellValue::Number(t2.timestamp() as f64)]]);
        assert_eq!(booker.seat_is_in_use(3).unwrap(), None);
        assert_eq!(booker.seat_is_in_use(5).unwrap(), Some(HEAD_ROW + 1));
    }

    #[test]
    fn taking_an_occupied_seat_writes_nothing() {
        let (mut booker, _) = booker(InMemoryStore::new());
        booker.take_a_seat(4, "a@x.com").unwrap();
        booker.take_a_seat(7, "b@x.com").unwrap();
        let before = booker.current_state().unwrap();
        let mutations = booker.store().mutation_count();

        let err = booker.take_a_seat(4, "c@x.com").unwrap_err();

        assert!(matches!(err, BookingError::SeatOccupied { seat: 4, row: 4 }));
        assert_eq!(booker.store().mutation_count(), mutations);
        assert_eq!(booker.current_state().unwrap(), before);
    }

    #[test]
    fn every_prior_pointer_moves_down_by_one() {
        let (mut booker, _) = booker(InMemoryStore::new());
        for (seat, who) in [(1, "a"), (2, "b"), (6, "c")] {
            booker.take_a_seat(seat, who).unwrap();
        }
        let before = booker.current_state().unwrap();

        booker.take_a_seat(9, "d").unwrap();

        let after = booker.current_state().unwrap();
        for (old, new) in before.iter().zip(&after) {
            match new.seat {
                9 => assert_eq!(new.row, Some(HEAD_ROW + 1)),
                _ => assert_eq!(new.row, old.row.map(|row| row + 1)),
            }
        }
        assert_eq!(after.iter().filter(|s| s.is_occupied()).count(), 4);
    }

    #[test]
    fn returning_a_free_seat_is_reported_without_writes() {
        let (mut booker, _) = booker(InMemoryStore::new());
        booker.take_a_seat(2, "a@x.com").unwrap();
        let mutations = booker.store().mutation_count();

        let err = booker.return_a_seat(8).unwrap_err();

        assert!(matches!(err, BookingError::SeatNotOccupied { seat: 8 }));
        assert!(!err.is_transient());
        assert_eq!(booker.store().mutation_count(), mutations);
    }

    #[test]
    fn seats_outside_the_pool_are_rejected_before_any_call() {
        let (mut booker, _) = booker(InMemoryStore::new());

        assert!(matches!(
            booker.take_a_seat(0, "a").unwrap_err(),
            BookingError::InvalidSeat { seat: 0, max: 10 }
        ));
        assert!(matches!(
            booker.return_a_seat(11).unwrap_err(),
            BookingError::InvalidSeat { seat: 11, .. }
        ));
        assert!(matches!(
            booker.take_a_seat(1, "").unwrap_err(),
            BookingError::EmptyOccupant
        ));
        assert!(booker.store().journal().is_empty());
    }

    #[test]
    fn head_insertion_keeps_pointers_resolving() {
        let (mut booker, clock) = booker(shifting_store());

        booker.take_a_seat(3, "a@x.com").unwrap();
        clock.advance(ChronoDuration::minutes(1));
        booker.take_a_seat(5, "b@x.com").unwrap();
        clock.advance(ChronoDuration::minutes(1));
        booker.take_a_seat(1, "c@x.com").unwrap();
        booker.audit().unwrap();

        let row = booker.seat_is_in_use(3).unwrap().unwrap();
        assert_eq!(ledger_row(&booker, row).unwrap().occupant, "a@x.com");

        clock.advance(ChronoDuration::minutes(1));
        booker.return_a_seat(3).unwrap();
        booker.audit().unwrap();

        let closed = ledger_row(&booker, row).unwrap();
        assert_eq!(closed.seat_number, 3);
        assert_eq!(closed.end_time, Some(t0() + ChronoDuration::minutes(3)));

        let entries = booker.ledger_entries().unwrap();
        let seats: Vec<_> = entries.iter().map(|(_, e)| e.seat_number).collect();
        assert_eq!(seats, vec![1, 5, 3]);
    }

    #[test]
    fn failed_pointer_write_leaves_partial_state() {
        let (mut booker, _) = booker(shifting_store());
        booker.take_a_seat(3, "a@x.com").unwrap();

        // guard read and ledger write succeed, the pointer write fails
        booker.store().fail_after(2);
        let err = booker.take_a_seat(5, "b@x.com").unwrap_err();

        assert!(err.is_transient());
        assert_eq!(booker.seat_is_in_use(5).unwrap(), None);
        let entries = booker.ledger_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(booker.audit().is_err());

        booker.reconcile().unwrap();

        booker.audit().unwrap();
        assert_eq!(booker.seat_is_in_use(5).unwrap(), Some(HEAD_ROW + 1));
        assert_eq!(booker.seat_is_in_use(3).unwrap(), Some(HEAD_ROW + 2));
    }

    #[test]
    fn failed_pointer_clear_leaves_stamped_row_behind() {
        let (mut booker, clock) = booker(shifting_store());
        booker.take_a_seat(3, "a@x.com").unwrap();
        let row = booker.seat_is_in_use(3).unwrap().unwrap();

        // pointer read and end-time stamp succeed, the pointer clear fails
        clock.advance(ChronoDuration::minutes(20));
        booker.store().fail_after(2);
        let err = booker.return_a_seat(3).unwrap_err();

        assert!(err.is_transient());
        assert_eq!(booker.seat_is_in_use(3).unwrap(), Some(row));
        let stamped = ledger_row(&booker, row).unwrap();
        assert_eq!(stamped.end_time, Some(t0() + ChronoDuration::minutes(20)));
        assert!(booker.audit().is_err());

        let rebuilt = booker.reconcile().unwrap();

        assert!(rebuilt.iter().all(|status| !status.is_occupied()));
        booker.audit().unwrap();
    }

    #[test]
    fn pointer_at_the_last_row_cannot_shift() {
        let (mut booker, _) = booker(InMemoryStore::new());
        let seat_one: RangeAddress = "current!B2".parse().unwrap();
        let last = CellValue::Number(f64::from(u32::MAX));
        booker.store.write(&seat_one, vec![vec![last.clone()]]).unwrap();

        let err = booker.take_a_seat(3, "a@x.com").unwrap_err();

        assert!(matches!(err, BookingError::Consistency { row: u32::MAX, .. }));
        assert!(!err.is_transient());
        assert_eq!(booker.store().read(&seat_one).unwrap(), vec![vec![last]]);
        assert_eq!(booker.seat_is_in_use(3).unwrap(), Some(HEAD_ROW));
    }

    #[test]
    fn audit_reads_both_tables_in_one_call() {
        let (mut booker, _) = booker(shifting_store());
        booker.take_a_seat(3, "a@x.com").unwrap();
        let calls = booker.store().journal().len();

        booker.audit().unwrap();

        let journal = booker.store().journal();
        assert_eq!(journal.len(), calls + 1);
        assert_eq!(journal[calls].kind, OpKind::BatchRead);
        assert_eq!(journal[calls].address, "current!B2:B11,sheet!C2:F");
    }

    #[test]
    fn reconcile_rebuilds_pointers_from_the_ledger() {
        let (mut booker, _) = booker(shifting_store());
        booker.take_a_seat(3, "a@x.com").unwrap();
        booker.take_a_seat(5, "b@x.com").unwrap();
        booker.return_a_seat(5).unwrap();
        booker.take_a_seat(7, "c@x.com").unwrap();
        let expected = booker.current_state().unwrap();

        let column: RangeAddress = "current!B2:B11".parse().unwrap();
        booker.store.clear(&column).unwrap();
        assert!(booker.audit().is_err());

        let rebuilt = booker.reconcile().unwrap();

        assert_eq!(rebuilt, expected);
        assert_eq!(booker.current_state().unwrap(), expected);
        booker.audit().unwrap();
    }

    #[test]
    fn confirm_settle_accepts_shifted_entry() {
        let clock = ManualClock::new(t0());
        let config = BookerConfig {
            settle: SettleStrategy::Confirm {
                deadline_millis: 1_000,
                poll_millis: 1,
            },
            ..config()
        };
        let mut booker = Booker::with_clock(shifting_store(), clock, config).unwrap();

        booker.take_a_seat(2, "a@x.com").unwrap();

        assert_eq!(booker.seat_is_in_use(2).unwrap(), Some(HEAD_ROW + 1));
    }

    #[test]
    fn confirm_settle_times_out_when_entry_never_lands() {
        // ledger head points at a sheet region the store drops on write
        struct BlackHole(InMemoryStore);

        impl TabularStore for BlackHole {
            fn read(&self, address: &RangeAddress) -> Result<Grid, StoreError> {
                self.0.read(address)
            }
            fn write(&mut self, address: &RangeAddress, rows: Grid) -> Result<(), StoreError> {
                if address.sheet == "sheet" {
                    return Ok(());
                }
                self.0.write(address, rows)
            }
            fn clear(&mut self, address: &RangeAddress) -> Result<(), StoreError> {
                self.0.clear(address)
            }
            fn append(
                &mut self,
                address: &RangeAddress,
                rows: Grid,
            ) -> Result<RangeAddress, StoreError> {
                self.0.append(address, rows)
            }
        }

        let config = BookerConfig {
            settle: SettleStrategy::Confirm {
                deadline_millis: 5,
                poll_millis: 1,
            },
            ..config()
        };
        let store = BlackHole(InMemoryStore::new());
        let mut booker = Booker::with_clock(store, ManualClock::new(t0()), config).unwrap();

        let err = booker.take_a_seat(2, "a@x.com").unwrap_err();

        assert!(matches!(err, BookingError::SettleTimeout { .. }));
        assert_eq!(booker.seat_is_in_use(2).unwrap(), None);
    }

    #[test]
    fn verified_return_refuses_a_foreign_row() {
        let clock = ManualClock::new(t0());
        let config = BookerConfig {
            verify_ledger_rows: true,
            ..config()
        };
        // no head insertion: the second take overwrites the first entry
        let mut booker = Booker::with_clock(InMemoryStore::new(), clock, config).unwrap();
        booker.take_a_seat(3, "a@x.com").unwrap();
        booker.take_a_seat(5, "b@x.com").unwrap();

        let mutations = booker.store().mutation_count();
        let err = booker.return_a_seat(3).unwrap_err();

        assert!(matches!(err, BookingError::Consistency { row: 4, .. }));
        assert_eq!(booker.store().mutation_count(), mutations);
        assert_eq!(booker.seat_is_in_use(3).unwrap(), Some(4));
    }

    #[test]
    fn verified_return_accepts_a_matching_row() {
        let config = BookerConfig {
            verify_ledger_rows: true,
            ..config()
        };
        let clock = ManualClock::new(t0());
        let mut booker = Booker::with_clock(shifting_store(), clock, config).unwrap();
        booker.take_a_seat(3, "a@x.com").unwrap();
        booker.take_a_seat(5, "b@x.com").unwrap();

        booker.return_a_seat(3).unwrap();
        booker.return_a_seat(5).unwrap();

        assert!(booker.current_state().unwrap().iter().all(|s| !s.is_occupied()));
        assert!(booker.ledger_entries().unwrap().iter().all(|(_, e)| !e.is_open()));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = BookerConfig {
            seat_count: 0,
            ..config()
        };
        assert!(Booker::new(InMemoryStore::new(), config).is_err());
    }
}
