// Seatbook Kernel
//
// Seat occupancy tracking over a range-addressed tabular store.

pub mod address;
pub mod booker;
pub mod clock;
pub mod config;
pub mod invariants;
pub mod ledger;
pub mod pointer;
pub mod replay;
pub mod store;

pub use booker::{Booker, BookingError};
pub use config::BookerConfig;
pub use store::{InMemoryStore, TabularStore};
