//! Static registry of tag widths and decoders.
//!
//! Widths are exact and fixed per tag; the registry never infers a width from
//! content. An id missing from the table is reported to the decoder as
//! unknown rather than guessed, because a guessed width desynchronizes every
//! later read in the payload.

use crate::types::TagValue;

/// Archive record number; its recurrence marks the start of a new record.
pub const TAG_RECORD_NUMBER: u8 = 0x10;

/// Marker of a length-prefixed extended block of 2-byte sub-tags.
pub const TAG_EXTENDED_BLOCK: u8 = 0xFE;

/// 15-character terminal IMEI.
pub const TAG_IMEI: u8 = 0x03;

/// Device date/time, Unix seconds.
pub const TAG_DATETIME: u8 = 0x20;

/// How a tag's fixed-width value bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    Ascii,
    Timestamp,
    Coordinates,
    SpeedCourse,
    BitFlags,
    Hundredths,
}

/// Width and decoder for one known tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSpec {
    pub width: usize,
    pub kind: TagKind,
}

const fn spec(width: usize, kind: TagKind) -> TagSpec {
    TagSpec { width, kind }
}

/// Look up a single-byte (top-level) tag. `None` means unknown.
pub fn lookup(tag: u8) -> Option<TagSpec> {
    use TagKind::*;
    let found = match tag {
        0x01 | 0x02 => spec(1, U8),      // hardware / firmware version
        0x03 => spec(15, Ascii),         // IMEI
        0x04 => spec(2, U16),            // device identifier
        0x10 => spec(2, U16),            // archive record number (sentinel)
        0x20 => spec(4, Timestamp),      // date and time
        0x21 => spec(2, U16),            // milliseconds
        0x30 => spec(9, Coordinates),    // satellites + lat/lon
        0x33 => spec(4, SpeedCourse),    // speed and direction, tenths
        0x34 => spec(2, I16),            // height above sea level, m
        0x35 => spec(1, U8),             // HDOP
        0x40 => spec(2, BitFlags),       // device status bits
        0x41 | 0x42 => spec(2, U16),     // supply / battery voltage, mV
        0x43 => spec(1, I8),             // inside temperature
        0x44 => spec(4, U32),            // acceleration
        0x45 | 0x46 => spec(2, BitFlags), // output / input states
        0x47 => spec(4, U32),            // ECO and driving style
        0x48 => spec(2, U16),            // expanded device status
        0x49 => spec(1, U8),             // transmission channel
        0x50..=0x59 => spec(2, U16),     // input voltages 0-3, input values 4-7, RS232 0-1
        0x60 | 0x61 => spec(4, U32),     // GSM network / location area code, extended
        0x62 => spec(1, U8),             // GSM signal level
        0x63..=0x69 => spec(2, U16),     // GSM cell id, area, operator, base station, country, network, LAC
        0x70 => spec(4, U32),            // GSM location area code, extended
        0x71 => spec(1, U8),             // GSM signal level
        0x72 => spec(2, U16),            // GSM cell id
        0x73 => spec(2, I16),            // temperature sensor
        0x74 => spec(1, U8),             // humidity sensor
        0x75 | 0x76 => spec(2, U16),     // pressure / light sensor
        0x77..=0x79 => spec(2, I16),     // accelerometer, input 8-9 values
        0x7A..=0x7F => spec(2, U16),     // input 10-15 values
        0xD4 => spec(4, U32),            // total mileage (GPS)
        0xE2..=0xE9 => spec(4, U32),     // user data 0-7
        _ => return None,
    };
    Some(found)
}

/// Look up a 2-byte sub-tag reached through an extended block.
pub fn lookup_extended(tag: u16) -> Option<TagSpec> {
    use TagKind::*;
    let found = match tag {
        0x0001..=0x0006 => spec(4, Hundredths), // modbus channels 0-5, scaled
        0x0007..=0x0010 => spec(4, U32),        // modbus channels 6-15
        _ => return None,
    };
    Some(found)
}

/// Decode value bytes per the tag's kind. `bytes` must be exactly the
/// registry width for that kind; the decoder guarantees this.
pub fn decode_value(kind: TagKind, bytes: &[u8]) -> TagValue {
    match kind {
        TagKind::U8 => TagValue::U8(bytes[0]),
        TagKind::U16 => TagValue::U16(u16::from_le_bytes([bytes[0], bytes[1]])),
        TagKind::U32 => TagValue::U32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        TagKind::I8 => TagValue::I8(bytes[0] as i8),
        TagKind::I16 => TagValue::I16(i16::from_le_bytes([bytes[0], bytes[1]])),
        TagKind::I32 => TagValue::I32(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        TagKind::Ascii => TagValue::Ascii(String::from_utf8_lossy(bytes).into_owned()),
        TagKind::Timestamp => {
            TagValue::Timestamp(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        TagKind::Coordinates => TagValue::Coordinates {
            satellites: bytes[0] & 0x0F,
            correctness: bytes[0] >> 4,
            latitude_micro: i32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]),
            longitude_micro: i32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]),
        },
        TagKind::SpeedCourse => TagValue::SpeedCourse {
            speed_tenths: u16::from_le_bytes([bytes[0], bytes[1]]),
            course_tenths: u16::from_le_bytes([bytes[2], bytes[3]]),
        },
        TagKind::BitFlags => TagValue::BitFlags(u16::from_le_bytes([bytes[0], bytes[1]])),
        TagKind::Hundredths => {
            TagValue::Hundredths(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
    }
}

/// Re-encode a decoded value to its wire bytes, the inverse of
/// [`decode_value`] for every kind.
pub fn encode_value(value: &TagValue) -> Vec<u8> {
    match value {
        TagValue::U8(v) => vec![*v],
        TagValue::U16(v) => v.to_le_bytes().to_vec(),
        TagValue::U32(v) => v.to_le_bytes().to_vec(),
        TagValue::I8(v) => vec![*v as u8],
        TagValue::I16(v) => v.to_le_bytes().to_vec(),
        TagValue::I32(v) => v.to_le_bytes().to_vec(),
        TagValue::Ascii(s) => s.as_bytes().to_vec(),
        TagValue::Timestamp(v) => v.to_le_bytes().to_vec(),
        TagValue::Coordinates {
            satellites,
            correctness,
            latitude_micro,
            longitude_micro,
        } => {
            let mut out = Vec::with_capacity(9);
            out.push((correctness << 4) | (satellites & 0x0F));
            out.extend_from_slice(&latitude_micro.to_le_bytes());
            out.extend_from_slice(&longitude_micro.to_le_bytes());
            out
        }
        TagValue::SpeedCourse {
            speed_tenths,
            course_tenths,
        } => {
            let mut out = Vec::with_capacity(4);
            out.extend_from_slice(&speed_tenths.to_le_bytes());
            out.extend_from_slice(&course_tenths.to_le_bytes());
            out
        }
        TagValue::BitFlags(v) => v.to_le_bytes().to_vec(),
        TagValue::Hundredths(v) => v.to_le_bytes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_and_marker_are_registered() {
        assert_eq!(lookup(TAG_RECORD_NUMBER), Some(spec(2, TagKind::U16)));
        // The extended marker has no fixed width; it is handled structurally
        // by the decoder, not through the registry.
        assert_eq!(lookup(TAG_EXTENDED_BLOCK), None);
    }

    #[test]
    fn known_widths() {
        assert_eq!(lookup(0x03).unwrap().width, 15);
        assert_eq!(lookup(0x20).unwrap().width, 4);
        assert_eq!(lookup(0x30).unwrap().width, 9);
        assert_eq!(lookup(0x33).unwrap().width, 4);
        assert_eq!(lookup(0x43).unwrap().width, 1);
        assert_eq!(lookup(0xE9).unwrap().width, 4);
    }

    #[test]
    fn unknown_ids_are_not_guessed() {
        assert_eq!(lookup(0x00), None);
        assert_eq!(lookup(0x9B), None);
        assert_eq!(lookup_extended(0x0000), None);
        assert_eq!(lookup_extended(0x0011), None);
    }

    #[test]
    fn extended_modbus_scaling_split() {
        assert_eq!(lookup_extended(0x0001).unwrap().kind, TagKind::Hundredths);
        assert_eq!(lookup_extended(0x0006).unwrap().kind, TagKind::Hundredths);
        assert_eq!(lookup_extended(0x0007).unwrap().kind, TagKind::U32);
        assert_eq!(lookup_extended(0x0010).unwrap().kind, TagKind::U32);
    }

    #[test]
    fn coordinates_decode_and_reencode() {
        // 7 satellites, correctness 0, lat 55.7558 N, lon 37.6173 E.
        let mut bytes = vec![0x07];
        bytes.extend_from_slice(&55_755_800i32.to_le_bytes());
        bytes.extend_from_slice(&37_617_300i32.to_le_bytes());

        let value = decode_value(TagKind::Coordinates, &bytes);
        assert_eq!(value.latitude_deg(), Some(55.7558));
        assert_eq!(value.longitude_deg(), Some(37.6173));
        assert_eq!(encode_value(&value), bytes);
    }

    #[test]
    fn speed_course_scaling() {
        let value = decode_value(TagKind::SpeedCourse, &[0x7B, 0x02, 0x43, 0x0D]);
        assert_eq!(value.speed_kmh(), Some(63.5));
        assert_eq!(value.course_deg(), Some(339.5));
    }

    #[test]
    fn bit_flags_access() {
        let value = decode_value(TagKind::BitFlags, &[0b0000_0101, 0b1000_0000]);
        assert_eq!(value.flag(0), Some(true));
        assert_eq!(value.flag(1), Some(false));
        assert_eq!(value.flag(2), Some(true));
        assert_eq!(value.flag(15), Some(true));
        assert_eq!(value.flag(16), None);
    }
}
