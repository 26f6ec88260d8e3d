//! Single-pass tag-stream decoder.
//!
//! One forward cursor over the payload. Record boundaries are inferred purely
//! from recurrence of the record-number sentinel; the sentinel's own entry
//! opens the new record. Extended blocks are decoded as a bounded sub-stream
//! with 2-byte tag ids and their own registry, never reading past the block's
//! declared length.

use bytes::Bytes;

use crate::error::DecodeError;
use crate::tags::{self, TagSpec, TAG_EXTENDED_BLOCK, TAG_RECORD_NUMBER};
use crate::types::{Record, TagEntry, TagId};

/// Decode a main-packet payload into records.
///
/// Pure function of the payload bytes and the static registry: decoding the
/// same bytes twice yields identical output. Any structural error rejects the
/// whole frame — no partial records are returned.
pub fn decode(payload: &Bytes) -> Result<Vec<Record>, DecodeError> {
    let mut records = Vec::new();
    let mut current = Record::default();
    let mut offset = 0usize;

    while offset < payload.len() {
        let tag = payload[offset];

        // Sentinel recurrence closes the running record; the sentinel's own
        // entry belongs to the record it opens.
        if tag == TAG_RECORD_NUMBER && !current.tags.is_empty() {
            records.push(std::mem::take(&mut current));
        }

        if tag == TAG_EXTENDED_BLOCK {
            offset = decode_extended_block(payload, offset, &mut current)?;
            continue;
        }

        let spec = tags::lookup(tag).ok_or(DecodeError::UnknownTag { tag, offset })?;
        let entry = read_entry(payload, TagId::Main(tag), offset, offset + 1, spec)?;
        offset += 1 + spec.width;
        current.tags.push(entry);
    }

    if !current.tags.is_empty() {
        records.push(current);
    }
    Ok(records)
}

/// Decode one extended block starting at its 0xFE marker. Returns the offset
/// just past the block.
fn decode_extended_block(
    payload: &Bytes,
    marker: usize,
    record: &mut Record,
) -> Result<usize, DecodeError> {
    let len_start = marker + 1;
    if payload.len() < len_start + 2 {
        return Err(DecodeError::TruncatedPayload {
            tag: u16::from(TAG_EXTENDED_BLOCK),
            offset: marker,
            needed: 2,
            available: payload.len() - len_start,
        });
    }
    let declared = usize::from(u16::from_le_bytes([payload[len_start], payload[len_start + 1]]));
    let body_start = len_start + 2;
    let body_end = body_start + declared;
    if body_end > payload.len() {
        return Err(DecodeError::TruncatedPayload {
            tag: u16::from(TAG_EXTENDED_BLOCK),
            offset: marker,
            needed: 2 + declared,
            available: payload.len() - len_start,
        });
    }

    let mut cursor = body_start;
    while cursor < body_end {
        if body_end - cursor < 2 {
            // A lone trailing byte cannot be a 2-byte sub-tag.
            return Err(DecodeError::MalformedExtendedBlock {
                offset: marker,
                declared,
                consumed: cursor - body_start + 2,
            });
        }
        let sub = u16::from_le_bytes([payload[cursor], payload[cursor + 1]]);
        let spec = tags::lookup_extended(sub).ok_or(DecodeError::UnknownExtendedTag {
            tag: sub,
            offset: cursor,
        })?;
        let value_start = cursor + 2;
        if value_start + spec.width > body_end {
            return Err(DecodeError::MalformedExtendedBlock {
                offset: marker,
                declared,
                consumed: value_start + spec.width - body_start,
            });
        }
        let entry = read_entry(payload, TagId::Extended(sub), cursor, value_start, spec)?;
        record.tags.push(entry);
        cursor = value_start + spec.width;
    }

    Ok(body_end)
}

/// Read one tag's fixed-width value at `value_start` and decode it.
fn read_entry(
    payload: &Bytes,
    tag: TagId,
    tag_offset: usize,
    value_start: usize,
    spec: TagSpec,
) -> Result<TagEntry, DecodeError> {
    let end = value_start + spec.width;
    if end > payload.len() {
        return Err(DecodeError::TruncatedPayload {
            tag: tag.raw(),
            offset: tag_offset,
            needed: spec.width,
            available: payload.len() - value_start,
        });
    }
    let raw = payload.slice(value_start..end);
    let value = tags::decode_value(spec.kind, &raw);
    Ok(TagEntry { tag, raw, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::GOLDEN_FRAME;
    use crate::types::{TagId, TagValue, CHECKSUM_SIZE, HEADER_SIZE};

    fn payload(bytes: &[u8]) -> Bytes {
        Bytes::copy_from_slice(bytes)
    }

    /// One record's worth of fixed-width tags after a sentinel.
    fn record_bytes(number: u16) -> Vec<u8> {
        let mut out = vec![TAG_RECORD_NUMBER];
        out.extend_from_slice(&number.to_le_bytes());
        out.extend_from_slice(&[0x20, 0x40, 0xE2, 0x01, 0x68]); // datetime
        out.extend_from_slice(&[0x41, 0xD0, 0x33]); // supply voltage 13264 mV
        out
    }

    #[test]
    fn golden_head_packet() {
        let body = payload(&GOLDEN_FRAME[HEADER_SIZE..GOLDEN_FRAME.len() - CHECKSUM_SIZE]);
        let records = decode(&body).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.imei(), Some("861230043907626"));
        assert_eq!(
            record.get(TagId::Main(0x01)),
            Some(&TagValue::U8(0x9A)),
            "hardware version"
        );
        assert_eq!(record.get(TagId::Main(0x02)), Some(&TagValue::U8(0x18)));
        assert_eq!(record.get(TagId::Main(0x04)), Some(&TagValue::U16(0x0032)));
        // Extended block: modbus channel 0, zero hundredths.
        assert_eq!(
            record.get(TagId::Extended(0x0001)),
            Some(&TagValue::Hundredths(0))
        );
    }

    #[test]
    fn splits_on_each_sentinel() {
        let mut body = record_bytes(1);
        body.extend(record_bytes(2));
        body.extend(record_bytes(3));

        let records = decode(&payload(&body)).unwrap();
        assert_eq!(records.len(), 3);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.record_number(), Some(i as u16 + 1));
            assert_eq!(record.tags.len(), 3, "fields never leak across sentinels");
        }
    }

    #[test]
    fn sentinel_as_first_tag_opens_no_empty_record() {
        let records = decode(&payload(&record_bytes(7))).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_number(), Some(7));
    }

    #[test]
    fn empty_payload_yields_no_records() {
        assert_eq!(decode(&payload(&[])).unwrap(), Vec::new());
    }

    #[test]
    fn unknown_tag_aborts_with_offset_and_no_records() {
        // Valid HDOP tag, then 0x9B which is not in the registry.
        let body = payload(&[0x35, 0x02, 0x9B, 0xFF]);
        let err = decode(&body).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownTag {
                tag: 0x9B,
                offset: 2
            }
        );
    }

    #[test]
    fn truncated_value_aborts() {
        // Datetime declares 4 value bytes, only 2 remain.
        let err = decode(&payload(&[0x20, 0x01, 0x02])).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedPayload {
                tag: 0x20,
                offset: 0,
                needed: 4,
                available: 2
            }
        );
    }

    #[test]
    fn extended_block_exact_length() {
        // Declared 6: one sub-tag (2) + u32 value (4). Consumes exactly.
        let body = payload(&[0xFE, 0x06, 0x00, 0x01, 0x00, 0x2C, 0x01, 0x00, 0x00]);
        let records = decode(&body).unwrap();
        assert_eq!(
            records[0].get(TagId::Extended(0x0001)),
            Some(&TagValue::Hundredths(300))
        );
    }

    #[test]
    fn extended_block_under_consumption_is_malformed() {
        // Declared 4 but the first sub-tag needs 6 bytes.
        let body = payload(&[0xFE, 0x04, 0x00, 0x01, 0x00, 0x00, 0x00]);
        let err = decode(&body).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MalformedExtendedBlock {
                offset: 0,
                declared: 4,
                consumed: 6
            }
        );
    }

    #[test]
    fn extended_block_trailing_byte_is_malformed() {
        // Declared 7: one full sub-tag entry (6) plus a stray byte.
        let body = payload(&[
            0xFE, 0x07, 0x00, 0x07, 0x00, 0x01, 0x00, 0x00, 0x00, 0xAA,
        ]);
        let err = decode(&body).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MalformedExtendedBlock {
                offset: 0,
                declared: 7,
                ..
            }
        ));
    }

    #[test]
    fn extended_block_longer_than_payload_is_truncated() {
        let body = payload(&[0xFE, 0x10, 0x00, 0x01, 0x00]);
        assert!(matches!(
            decode(&body).unwrap_err(),
            DecodeError::TruncatedPayload { tag: 0xFE, .. }
        ));
    }

    #[test]
    fn unknown_extended_sub_tag_aborts() {
        let body = payload(&[0xFE, 0x06, 0x00, 0x99, 0x09, 0x00, 0x00, 0x00, 0x00]);
        let err = decode(&body).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownExtendedTag {
                tag: 0x0999,
                offset: 3
            }
        );
    }

    #[test]
    fn decoding_is_idempotent() {
        let body = payload(&GOLDEN_FRAME[HEADER_SIZE..GOLDEN_FRAME.len() - CHECKSUM_SIZE]);
        assert_eq!(decode(&body).unwrap(), decode(&body).unwrap());
    }

    #[test]
    fn reencoding_reproduces_wire_bytes() {
        let mut body = record_bytes(42);
        // Coordinates and speed/course exercise the scaled kinds.
        body.push(0x30);
        body.push(0x08);
        body.extend_from_slice(&55_755_800i32.to_le_bytes());
        body.extend_from_slice(&37_617_300i32.to_le_bytes());
        body.extend_from_slice(&[0x33, 0x7B, 0x02, 0x43, 0x0D]);

        let records = decode(&payload(&body)).unwrap();
        for entry in &records[0].tags {
            assert_eq!(
                crate::tags::encode_value(&entry.value),
                entry.raw.as_ref(),
                "tag {:?} must re-encode to its wire bytes",
                entry.tag
            );
        }
    }
}
