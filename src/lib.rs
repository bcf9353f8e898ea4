//! # vecwal
//!
//! A double-buffered write-ahead log for a vector-database storage engine.
//!
//! Mutation records (entity inserts, deletes, flush markers) are captured
//! durably in on-disk segment files before they are applied to the
//! in-memory indexes. A record is recoverable as soon as `append` returns;
//! a replayer streams records back with `next` after a restart, and a
//! lagging applier can do the same during normal operation while the log
//! is truncated behind it.
//!
//! ## Positions
//!
//! Every position in the log is a 64-bit LSN: the high half names a
//! segment file, the low half a byte offset inside it. The LSN assigned to
//! a record points just past the record, so it doubles as the next read
//! position and as the `last_applied_lsn` bound handed to `next`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vecwal::{LogRecord, WalBuffer, WalOptions};
//!
//! let mut wal = WalBuffer::new(&WalOptions::new("./wal"))?;
//! wal.init(0, 0)?;
//!
//! // Producer side.
//! let mut record = LogRecord::insert("books", "2026-08", vec![1, 2, 3], payload);
//! let lsn = wal.append(&mut record)?;
//!
//! // Consumer side.
//! let mut out = LogRecord::default();
//! wal.next(lsn, &mut out)?;
//! ```
//!
//! One producer thread may call `append` while one consumer thread calls
//! `next`; everything else requires exclusive access.

// Public modules
pub mod error;
pub mod options;
pub mod types;

// Internal modules
mod util;
mod wal;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use options::{
    WalOptions, WalOptionsBuilder, DEFAULT_WAL_BUFFER_SIZE, WAL_BUFFER_MAX_SIZE,
    WAL_BUFFER_MIN_SIZE,
};
pub use types::{LogRecord, MutationType};

// WAL interface
pub use wal::{build_lsn, parse_lsn, record_size, WalBuffer, LSN_OFFSET_MASK, RECORD_HEADER_SIZE};
