//! Core domain logic for calendar-driven targets.
//!
//! This crate contains the fundamental types and logic for:
//! - Bucketing: flooring instants and sampling a lookahead window
//! - Normalization: turning raw calendar events into integer-valued intervals
//! - Resolution: picking exactly one winning event per bucket
//! - Schedules: the resolved bucket-to-target mapping and its store contract
//!
//! Nothing in this crate performs I/O. Events come in as values, schedules go
//! out as values, and persistence is delegated to a [`ScheduleStore`].

mod bucket;
pub mod config;
pub mod event;
mod resolve;
pub mod schedule;
pub mod store;

pub use bucket::{Buckets, Granularity, buckets, floor};
pub use config::{ConfigError, MAX_LOOKAHEAD_MINUTES, ScheduleConfig, TieBreak, parse_time_zone};
pub use event::{Event, RawEvent, date_to_instant, normalize, normalize_events};
pub use resolve::{resolve, resolve_normalized};
pub use schedule::{Schedule, lookup};
pub use store::{MemoryScheduleStore, ScheduleStore};
