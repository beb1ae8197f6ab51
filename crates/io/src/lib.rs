//! `feedsync-io` — Feed file I/O.
//!
//! Reads feed CSVs into rows, writes projected views back out, moves files
//! through a feed store and appends the run log.

pub mod csv;
pub mod error;
pub mod runlog;
pub mod store;

pub use crate::csv::{read_feed, write_view};
pub use error::IoError;
pub use runlog::RunLogEntry;
pub use store::{DirStore, FeedStore};
