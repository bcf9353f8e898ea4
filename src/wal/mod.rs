//! Write-ahead log for crash recovery and lagging appliers.
//!
//! Mutation records are appended durably to segment files before they are
//! applied to the in-memory indexes. A replayer reads them back after a
//! restart; during normal operation an applier that has fallen behind can
//! stream them the same way.
//!
//! # Format
//!
//! The log is a directory of `<N>.wal` files for monotonically increasing
//! `N`. Each file holds a contiguous stream of records; a file is sealed
//! when the writer rolls over to `N + 1`. A record is a 21-byte packed
//! little-endian header followed by the variable tail:
//!
//! ```text
//! lsn (8) | type (1) | collection_id_size (2) | partition_tag_size (2)
//!        | entity_num (4) | data_size (4)
//! collection_id || partition_tag || ids (8 per entity) || data
//! ```
//!
//! The header's `lsn` names the position just past the record itself, so
//! every record is self-locating and an LSN doubles as the next read
//! position.

mod buffer;
mod file_handler;
mod record;

pub use buffer::WalBuffer;
pub use record::{record_size, RECORD_HEADER_SIZE};

/// Mask selecting the offset half of an LSN.
pub const LSN_OFFSET_MASK: u64 = 0xFFFF_FFFF;

/// Pack a `(file_no, offset)` pair into an LSN.
pub fn build_lsn(file_no: u32, offset: u32) -> u64 {
    (file_no as u64) << 32 | offset as u64
}

/// Split an LSN into its `(file_no, offset)` halves.
pub fn parse_lsn(lsn: u64) -> (u32, u32) {
    ((lsn >> 32) as u32, (lsn & LSN_OFFSET_MASK) as u32)
}
