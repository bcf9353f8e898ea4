//! On-disk record encoding.

use bytes::{Buf, BufMut, Bytes};

use crate::types::{LogRecord, MutationType};
use crate::{Error, Result};

/// Size of the packed record header.
///
/// Layout, little-endian, no padding:
///
/// ```text
/// offset  size  field
///   0      8    lsn
///   8      1    mutation type
///   9      2    collection_id size
///  11      2    partition_tag size
///  13      4    entity count
///  17      4    data size
/// ```
pub const RECORD_HEADER_SIZE: usize = 21;

/// Bytes per entity id in the record tail.
pub(crate) const ID_SIZE: usize = 8;

/// Exact encoded length of `record` before any width narrowing.
pub(crate) fn encoded_len(record: &LogRecord) -> usize {
    RECORD_HEADER_SIZE
        + record.collection_id.len()
        + record.partition_tag.len()
        + record.ids.len() * ID_SIZE
        + record.data.len()
}

/// Total encoded size of `record`: header plus variable tail.
pub fn record_size(record: &LogRecord) -> u32 {
    encoded_len(record) as u32
}

/// Serialize `record` into `dst` under the pre-assigned `lsn`.
///
/// `dst` must be exactly `record_size(record)` bytes.
pub(crate) fn encode_record(record: &LogRecord, lsn: u64, mut dst: &mut [u8]) {
    debug_assert_eq!(dst.len(), record_size(record) as usize);

    dst.put_u64_le(lsn);
    dst.put_u8(record.mutation.to_byte());
    dst.put_u16_le(record.collection_id.len() as u16);
    dst.put_u16_le(record.partition_tag.len() as u16);
    dst.put_u32_le(record.ids.len() as u32);
    dst.put_u32_le(record.data.len() as u32);

    dst.put_slice(&record.collection_id);
    dst.put_slice(&record.partition_tag);
    for id in &record.ids {
        dst.put_i64_le(*id);
    }
    dst.put_slice(&record.data);
}

/// Deserialize the record starting at the beginning of `src`.
///
/// `src` runs from the record's first byte to the end of the readable
/// region; the header says where the record itself ends. Payload fields
/// are copied out, so the returned record does not borrow `src`.
pub(crate) fn decode_record(mut src: &[u8]) -> Result<LogRecord> {
    if src.len() < RECORD_HEADER_SIZE {
        return Err(Error::corruption("record header extends beyond buffer"));
    }

    let lsn = src.get_u64_le();
    let type_byte = src.get_u8();
    let mutation = MutationType::from_byte(type_byte)
        .ok_or_else(|| Error::corruption(format!("invalid mutation type {}", type_byte)))?;
    let collection_id_len = src.get_u16_le() as usize;
    let partition_tag_len = src.get_u16_le() as usize;
    let entity_num = src.get_u32_le() as usize;
    let data_size = src.get_u32_le() as usize;

    let tail = collection_id_len + partition_tag_len + entity_num * ID_SIZE + data_size;
    if src.len() < tail {
        return Err(Error::corruption("record tail extends beyond buffer"));
    }

    let collection_id = Bytes::copy_from_slice(&src[..collection_id_len]);
    src.advance(collection_id_len);
    let partition_tag = Bytes::copy_from_slice(&src[..partition_tag_len]);
    src.advance(partition_tag_len);

    let mut ids = Vec::with_capacity(entity_num);
    for _ in 0..entity_num {
        ids.push(src.get_i64_le());
    }
    let data = Bytes::copy_from_slice(&src[..data_size]);

    Ok(LogRecord {
        mutation,
        lsn,
        collection_id,
        partition_tag,
        ids,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> LogRecord {
        LogRecord::insert(
            "books",
            "2026-08",
            vec![1, -2, i64::MAX],
            Bytes::from_static(&[0xAA, 0xBB, 0xCC]),
        )
    }

    #[test]
    fn test_record_size() {
        let record = sample_record();
        // 21 + 5 + 7 + 3 * 8 + 3
        assert_eq!(record_size(&record), 60);

        assert_eq!(record_size(&LogRecord::default()), 21);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let record = sample_record();
        let size = record_size(&record) as usize;

        let mut buf = vec![0u8; size];
        encode_record(&record, 0x0000_0002_0000_1000, &mut buf);

        let decoded = decode_record(&buf).unwrap();
        assert_eq!(decoded.mutation, record.mutation);
        assert_eq!(decoded.lsn, 0x0000_0002_0000_1000);
        assert_eq!(decoded.collection_id, record.collection_id);
        assert_eq!(decoded.partition_tag, record.partition_tag);
        assert_eq!(decoded.ids, record.ids);
        assert_eq!(decoded.data, record.data);
    }

    #[test]
    fn test_header_layout_is_bit_exact() {
        let record = sample_record();
        let mut buf = vec![0u8; record_size(&record) as usize];
        encode_record(&record, 0x0102_0304_0506_0708, &mut buf);

        assert_eq!(&buf[0..8], &0x0102_0304_0506_0708u64.to_le_bytes());
        assert_eq!(buf[8], MutationType::InsertEntity.to_byte());
        assert_eq!(&buf[9..11], &5u16.to_le_bytes());
        assert_eq!(&buf[11..13], &7u16.to_le_bytes());
        assert_eq!(&buf[13..17], &3u32.to_le_bytes());
        assert_eq!(&buf[17..21], &3u32.to_le_bytes());

        assert_eq!(&buf[21..26], b"books");
        assert_eq!(&buf[26..33], b"2026-08");
        assert_eq!(&buf[33..41], &1i64.to_le_bytes());
        assert_eq!(&buf[57..60], &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn test_empty_fields_decode_as_empty() {
        let record = LogRecord::flush("");
        let mut buf = vec![0u8; RECORD_HEADER_SIZE];
        encode_record(&record, 21, &mut buf);

        let decoded = decode_record(&buf).unwrap();
        assert_eq!(decoded.mutation, MutationType::Flush);
        assert!(decoded.collection_id.is_empty());
        assert!(decoded.partition_tag.is_empty());
        assert!(decoded.ids.is_empty());
        assert!(decoded.data.is_empty());
    }

    #[test]
    fn test_decode_extra_trailing_bytes_are_ignored() {
        let record = sample_record();
        let size = record_size(&record) as usize;

        let mut buf = vec![0u8; size + 64];
        encode_record(&record, 60, &mut buf[..size]);

        let decoded = decode_record(&buf).unwrap();
        assert_eq!(decoded.ids, record.ids);
    }

    #[test]
    fn test_decode_short_header() {
        assert!(decode_record(&[0u8; 20]).unwrap_err().is_corruption());
    }

    #[test]
    fn test_decode_truncated_tail() {
        let record = sample_record();
        let size = record_size(&record) as usize;
        let mut buf = vec![0u8; size];
        encode_record(&record, 60, &mut buf);

        let err = decode_record(&buf[..size - 1]).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_decode_invalid_mutation_type() {
        let record = sample_record();
        let size = record_size(&record) as usize;
        let mut buf = vec![0u8; size];
        encode_record(&record, 60, &mut buf);
        buf[8] = 0x7F;

        let err = decode_record(&buf).unwrap_err();
        assert!(err.is_corruption());
    }
}
