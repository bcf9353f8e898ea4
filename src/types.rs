//! Core record types shared between the engine and the write-ahead log.

use bytes::Bytes;

/// Kind of mutation captured by a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MutationType {
    /// No record. Returned by `next` at end-of-stream.
    #[default]
    None = 0,
    /// Entity insertion: ids plus an opaque vector payload.
    InsertEntity = 1,
    /// Entity deletion by id.
    DeleteEntity = 2,
    /// Flush marker for a collection.
    Flush = 3,
}

impl MutationType {
    /// Create from byte value.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(MutationType::None),
            1 => Some(MutationType::InsertEntity),
            2 => Some(MutationType::DeleteEntity),
            3 => Some(MutationType::Flush),
            _ => None,
        }
    }

    /// Convert to byte.
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// A single mutation record.
///
/// The producer fills every field except `lsn`, which is assigned by
/// [`append`](crate::WalBuffer::append). Records handed back by
/// [`next`](crate::WalBuffer::next) carry payloads copied out of the
/// internal slabs, so they stay valid across later `next` and `reset`
/// calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogRecord {
    /// What this record does.
    pub mutation: MutationType,
    /// Position just past this record in its segment file.
    pub lsn: u64,
    /// Target collection (opaque, at most 65535 bytes).
    pub collection_id: Bytes,
    /// Target partition within the collection (opaque, at most 65535 bytes).
    pub partition_tag: Bytes,
    /// Entity ids the mutation touches.
    pub ids: Vec<i64>,
    /// Opaque payload, e.g. packed vector data.
    pub data: Bytes,
}

impl LogRecord {
    /// Build an insert record.
    pub fn insert<C, P, D>(collection_id: C, partition_tag: P, ids: Vec<i64>, data: D) -> Self
    where
        C: Into<Bytes>,
        P: Into<Bytes>,
        D: Into<Bytes>,
    {
        Self {
            mutation: MutationType::InsertEntity,
            lsn: 0,
            collection_id: collection_id.into(),
            partition_tag: partition_tag.into(),
            ids,
            data: data.into(),
        }
    }

    /// Build a delete record.
    pub fn delete<C>(collection_id: C, ids: Vec<i64>) -> Self
    where
        C: Into<Bytes>,
    {
        Self {
            mutation: MutationType::DeleteEntity,
            lsn: 0,
            collection_id: collection_id.into(),
            partition_tag: Bytes::new(),
            ids,
            data: Bytes::new(),
        }
    }

    /// Build a flush marker. An empty collection id flushes everything.
    pub fn flush<C>(collection_id: C) -> Self
    where
        C: Into<Bytes>,
    {
        Self {
            mutation: MutationType::Flush,
            lsn: 0,
            collection_id: collection_id.into(),
            partition_tag: Bytes::new(),
            ids: Vec::new(),
            data: Bytes::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_type_roundtrip() {
        for mt in [
            MutationType::None,
            MutationType::InsertEntity,
            MutationType::DeleteEntity,
            MutationType::Flush,
        ] {
            assert_eq!(MutationType::from_byte(mt.to_byte()), Some(mt));
        }
    }

    #[test]
    fn test_invalid_mutation_type() {
        assert_eq!(MutationType::from_byte(4), None);
        assert_eq!(MutationType::from_byte(255), None);
    }

    #[test]
    fn test_default_record_is_empty() {
        let record = LogRecord::default();
        assert_eq!(record.mutation, MutationType::None);
        assert_eq!(record.lsn, 0);
        assert!(record.collection_id.is_empty());
        assert!(record.ids.is_empty());
        assert!(record.data.is_empty());
    }

    #[test]
    fn test_constructors() {
        let insert = LogRecord::insert("books", "2026-08", vec![1, 2], vec![0u8; 8]);
        assert_eq!(insert.mutation, MutationType::InsertEntity);
        assert_eq!(&insert.collection_id[..], b"books");
        assert_eq!(&insert.partition_tag[..], b"2026-08");
        assert_eq!(insert.ids, vec![1, 2]);
        assert_eq!(insert.data.len(), 8);

        let delete = LogRecord::delete("books", vec![7]);
        assert_eq!(delete.mutation, MutationType::DeleteEntity);
        assert!(delete.partition_tag.is_empty());
        assert!(delete.data.is_empty());

        let flush = LogRecord::flush("");
        assert_eq!(flush.mutation, MutationType::Flush);
        assert!(flush.collection_id.is_empty());
    }
}
