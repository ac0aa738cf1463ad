//! Schedule persistence contract.
//!
//! Resolution never touches storage itself. A surrounding service saves each
//! freshly resolved [`Schedule`] through a [`ScheduleStore`] and reads it back
//! for lookups between passes.
//!
//! # Thread Safety
//!
//! [`MemoryScheduleStore`] hands out `Arc<Schedule>` snapshots. Publishing a
//! new schedule swaps the shared pointer under a short write lock, so readers
//! are never blocked by a resolution pass and never see a partial schedule.

use std::convert::Infallible;
use std::sync::{Arc, PoisonError, RwLock};

use crate::schedule::Schedule;

/// Durable home for the most recent schedule.
///
/// Saving an empty schedule clears the store: there is nothing to look up
/// until the next pass finds a governing event.
pub trait ScheduleStore {
    /// Error type of the underlying storage.
    type Error;

    /// Replaces the stored schedule.
    fn save(&mut self, schedule: &Schedule) -> Result<(), Self::Error>;

    /// Returns the stored schedule, if any.
    fn load(&self) -> Result<Option<Schedule>, Self::Error>;
}

/// In-process store shared between one writer and many readers.
#[derive(Debug, Default)]
pub struct MemoryScheduleStore {
    current: RwLock<Option<Arc<Schedule>>>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replaces the current schedule.
    pub fn publish(&self, schedule: Schedule) {
        let next = (!schedule.is_empty()).then(|| Arc::new(schedule));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Returns a snapshot of the current schedule.
    pub fn snapshot(&self) -> Option<Arc<Schedule>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ScheduleStore for MemoryScheduleStore {
    type Error = Infallible;

    fn save(&mut self, schedule: &Schedule) -> Result<(), Self::Error> {
        self.publish(schedule.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<Schedule>, Self::Error> {
        Ok(self.snapshot().map(|schedule| Schedule::clone(&schedule)))
    }
}
