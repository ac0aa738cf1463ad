//! CLI subcommand implementations.

pub mod import;
pub mod resolve;
pub mod schedule;
pub mod status;
pub mod target;
pub mod util;
