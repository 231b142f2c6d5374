//! Settlement of band mutual funds.
//!
//! [`settlement::settle`] is the pure FIFO reducer over a fund's inflow and
//! outflow events. [`coordinator::RecomputeCoordinator`] wraps every write to
//! those events so the cached settlement is always replayed inside the same
//! transaction as the write itself.

pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod money;
pub mod report;
pub mod settlement;
pub mod splitter;

#[cfg(test)]
mod testing;

pub use coordinator::{CoordinatorSettings, RecomputeCoordinator};
pub use error::{ComputeError, ErrorKind, Result};
pub use money::Cents;
