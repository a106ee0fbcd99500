// Pointer Replay
//
// Derives the pointer table from ledger contents alone. The ledger is the
// authoritative record of who sits where; the pointer table is an index
// over it and can always be rebuilt.

use std::collections::BTreeMap;

use crate::ledger::{LedgerEntry, RowIndex};

/// Outcome of replaying the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplayOutcome {
    /// Derived pointer of seat `i + 1` at index `i`.
    pub pointers: Vec<Option<RowIndex>>,

    /// Seats with several open sessions, and the rows that lost.
    pub superseded: BTreeMap<u32, Vec<RowIndex>>,

    /// Rows of open sessions whose seat is outside the configured pool.
    pub out_of_range: Vec<RowIndex>,
}

impl ReplayOutcome {
    pub fn is_clean(&self) -> bool {
        self.superseded.is_empty() && self.out_of_range.is_empty()
    }
}

/// Replay ledger entries into a pointer column for `seat_count` seats.
///
/// When a seat has more than one open session the newest one, the one
/// nearest the head, wins.
pub fn replay_pointers(entries: &[(RowIndex, LedgerEntry)], seat_count: u32) -> ReplayOutcome {
    let mut outcome = ReplayOutcome {
        pointers: vec![None; seat_count as usize],
        ..ReplayOutcome::default()
    };

    let mut ordered: Vec<_> = entries.iter().filter(|(_, entry)| entry.is_open()).collect();
    ordered.sort_by_key(|(row, _)| *row);

    for (row, entry) in ordered {
        let seat = entry.seat_number;
        if seat == 0 || seat > seat_count {
            outcome.out_of_range.push(*row);
            continue;
        }

        let slot = &mut outcome.pointers[(seat - 1) as usize];
        if slot.is_none() {
            *slot = Some(*row);
        } else {
            outcome.superseded.entry(seat).or_default().push(*row);
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn entry(seat: u32, open: bool) -> LedgerEntry {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut entry = LedgerEntry::open(start, seat, "someone@x.com");
        if !open {
            entry.end_time = Some(start);
        }
        entry
    }

    #[test]
    fn open_sessions_become_pointers() {
        let entries = vec![
            (3, entry(5, true)),
            (4, entry(3, true)),
            (5, entry(1, false)),
        ];

        let outcome = replay_pointers(&entries, 5);

        assert!(outcome.is_clean());
        assert_eq!(outcome.pointers, vec![None, None, Some(4), None, Some(3)]);
    }

    #[test]
    fn newest_open_session_wins() {
        let entries = vec![(7, entry(2, true)), (3, entry(2, true)), (5, entry(2, true))];

        let outcome = replay_pointers(&entries, 2);

        assert_eq!(outcome.pointers, vec![None, Some(3)]);
        assert_eq!(outcome.superseded.get(&2), Some(&vec![5, 7]));
        assert!(!outcome.is_clean());
    }

    #[test]
    fn seats_outside_pool_are_reported() {
        let entries = vec![(3, entry(9, true))];

        let outcome = replay_pointers(&entries, 4);

        assert_eq!(outcome.pointers, vec![None; 4]);
        assert_eq!(outcome.out_of_range, vec![3]);
    }
}
