//! Data model for decoded Galileosky frames.

use bytes::Bytes;
use serde::Serialize;

use crate::crc;
use crate::error::ChecksumMismatch;
use crate::tags::{TAG_DATETIME, TAG_IMEI, TAG_RECORD_NUMBER};

/// Frame header size: 1 (packet type) + 2 (length field) = 3 bytes.
pub const HEADER_SIZE: usize = 3;

/// Trailing checksum field size.
pub const CHECKSUM_SIZE: usize = 2;

/// Packet-type header byte of a head or main packet.
pub const PACKET_MAIN: u8 = 0x01;

/// Packet-type header byte of a packet that only needs a confirmation.
pub const PACKET_IGNORABLE: u8 = 0x15;

/// Kind of packet, determined by the first byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PacketType {
    /// Head or main packet carrying tagged records.
    Main,
    /// Keep-alive class packet; confirmed, never decoded.
    Ignorable,
    /// Vendor extension packet; confirmed, payload passed through opaque.
    Extension(u8),
}

impl PacketType {
    /// Classify a packet-type header byte.
    pub fn from_header(byte: u8) -> Self {
        match byte {
            PACKET_MAIN => PacketType::Main,
            PACKET_IGNORABLE => PacketType::Ignorable,
            other => PacketType::Extension(other),
        }
    }

    /// The header byte this type is written as.
    pub fn header_byte(self) -> u8 {
        match self {
            PacketType::Main => PACKET_MAIN,
            PacketType::Ignorable => PACKET_IGNORABLE,
            PacketType::Extension(b) => b,
        }
    }
}

/// One complete protocol packet as received from the wire.
///
/// Constructed by the [`FrameReader`](crate::FrameReader) once header, length
/// field, declared payload and trailing checksum are all buffered; consumed
/// exactly once by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Kind of packet, from the header byte.
    pub packet_type: PacketType,
    /// The terminal is replaying archived records rather than sending live
    /// data (top bit of the length field).
    pub archived: bool,
    /// Payload bytes; exactly the declared length.
    pub payload: Bytes,
    /// Trailing checksum field, little-endian on the wire.
    pub checksum: u16,
    /// Full frame bytes, header through checksum.
    pub(crate) raw: Bytes,
}

impl RawFrame {
    /// The complete frame as received, header through checksum.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Recompute the checksum over header + length + payload and compare it
    /// against the trailing field.
    pub fn verify_checksum(&self) -> Result<(), ChecksumMismatch> {
        let body = &self.raw[..self.raw.len() - CHECKSUM_SIZE];
        let computed = crc::checksum(body);
        if computed == self.checksum {
            Ok(())
        } else {
            Err(ChecksumMismatch {
                computed,
                received: self.checksum,
            })
        }
    }
}

/// Identifier of a decoded field: single-byte top-level tag or 2-byte
/// sub-tag reached through an extended block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TagId {
    Main(u8),
    Extended(u16),
}

impl TagId {
    /// Numeric id regardless of width.
    pub fn raw(self) -> u16 {
        match self {
            TagId::Main(t) => u16::from(t),
            TagId::Extended(t) => t,
        }
    }
}

/// A decoded tag value.
///
/// Scaled quantities keep their raw wire integers so that re-encoding a
/// decoded value reproduces the original bytes exactly; the accessor methods
/// convert to engineering units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TagValue {
    U8(u8),
    U16(u16),
    U32(u32),
    I8(i8),
    I16(i16),
    I32(i32),
    /// Fixed-width ASCII, e.g. the 15-character IMEI.
    Ascii(String),
    /// Seconds since the Unix epoch.
    Timestamp(u32),
    /// GPS/GLONASS fix: satellites in view, fix-correctness nibble and
    /// coordinates in microdegrees.
    Coordinates {
        satellites: u8,
        correctness: u8,
        latitude_micro: i32,
        longitude_micro: i32,
    },
    /// Speed in tenths of km/h, course in tenths of degrees.
    SpeedCourse { speed_tenths: u16, course_tenths: u16 },
    /// 16 packed boolean states (inputs, outputs, device status).
    BitFlags(u16),
    /// External-bus (modbus) value carried as hundredths.
    Hundredths(u32),
}

impl TagValue {
    /// Latitude in degrees, for coordinate values.
    pub fn latitude_deg(&self) -> Option<f64> {
        match self {
            TagValue::Coordinates { latitude_micro, .. } => {
                Some(f64::from(*latitude_micro) / 1_000_000.0)
            }
            _ => None,
        }
    }

    /// Longitude in degrees, for coordinate values.
    pub fn longitude_deg(&self) -> Option<f64> {
        match self {
            TagValue::Coordinates {
                longitude_micro, ..
            } => Some(f64::from(*longitude_micro) / 1_000_000.0),
            _ => None,
        }
    }

    /// Speed in km/h, for speed-and-course values.
    pub fn speed_kmh(&self) -> Option<f64> {
        match self {
            TagValue::SpeedCourse { speed_tenths, .. } => Some(f64::from(*speed_tenths) / 10.0),
            _ => None,
        }
    }

    /// Course over ground in degrees, for speed-and-course values.
    pub fn course_deg(&self) -> Option<f64> {
        match self {
            TagValue::SpeedCourse { course_tenths, .. } => Some(f64::from(*course_tenths) / 10.0),
            _ => None,
        }
    }

    /// State of bit `index` (0..16), for bit-flag values.
    pub fn flag(&self, index: u8) -> Option<bool> {
        match self {
            TagValue::BitFlags(bits) if index < 16 => Some(bits & (1 << index) != 0),
            _ => None,
        }
    }
}

/// One decoded field within a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagEntry {
    pub tag: TagId,
    /// Value bytes exactly as they appeared on the wire.
    pub raw: Bytes,
    pub value: TagValue,
}

/// One logical group of tagged fields within a frame's payload, delimited by
/// recurrence of the record-number sentinel tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    pub tags: Vec<TagEntry>,
}

impl Record {
    /// First value decoded for `tag`, if present.
    pub fn get(&self, tag: TagId) -> Option<&TagValue> {
        self.tags.iter().find(|e| e.tag == tag).map(|e| &e.value)
    }

    /// Archive record number from the sentinel tag.
    pub fn record_number(&self) -> Option<u16> {
        match self.get(TagId::Main(TAG_RECORD_NUMBER)) {
            Some(TagValue::U16(n)) => Some(*n),
            _ => None,
        }
    }

    /// Terminal IMEI, present in head packets.
    pub fn imei(&self) -> Option<&str> {
        match self.get(TagId::Main(TAG_IMEI)) {
            Some(TagValue::Ascii(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Device timestamp as seconds since the Unix epoch.
    pub fn timestamp(&self) -> Option<u32> {
        match self.get(TagId::Main(TAG_DATETIME)) {
            Some(TagValue::Timestamp(t)) => Some(*t),
            _ => None,
        }
    }
}
