//! Wire protocol decoding engine for Galileosky tracking terminals.
//!
//! The engine is a pure function of a byte stream: reassemble frames, verify
//! their checksum, decode the tag stream into records and build the
//! confirmation reply. It owns no database and performs no I/O.
//!
//! # Frame format
//!
//! ```text
//! +--------+----------------+------------------+----------+
//! | Type   | Length         |     Payload      | Checksum |
//! | 1 byte | u16 LE         |  Length bytes    | u16 LE   |
//! +--------+----------------+------------------+----------+
//!          | bit 15: archive flag              | over all |
//!          | bits 0-14: payload length         | preceding|
//! ```
//!
//! The payload of a main packet is a stream of single-byte tags, each
//! followed by a fixed-width value per the static registry. Records are
//! delimited by recurrence of the record-number sentinel (0x10); tag 0xFE
//! introduces a length-bounded nested block of 2-byte sub-tags.
//!
//! # Example
//!
//! ```rust
//! use galileosky_protocol::{confirmation, decode, FrameOutcome, FrameReader};
//!
//! let wire: &[u8] = &[
//!     0x01, 0x20, 0x00, 0x01, 0x9A, 0x02, 0x18, 0x03, 0x38, 0x36, 0x31, 0x32, 0x33, 0x30,
//!     0x30, 0x34, 0x33, 0x39, 0x30, 0x37, 0x36, 0x32, 0x36, 0x04, 0x32, 0x00, 0xFE, 0x06,
//!     0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x8F, 0x29,
//! ];
//!
//! let mut reader = FrameReader::new();
//! reader.push(wire);
//! let frame = reader.next_frame().unwrap().unwrap();
//! frame.verify_checksum().unwrap();
//!
//! let records = decode(&frame.payload).unwrap();
//! assert_eq!(records[0].imei(), Some("861230043907626"));
//!
//! let reply = confirmation(frame.as_bytes(), FrameOutcome::Accepted);
//! assert_eq!(reply, [0x02, 0x8F, 0x29]);
//! ```

pub mod confirm;
pub mod crc;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod tags;
pub mod types;

pub use confirm::{confirmation, FrameOutcome, ACK_HEADER, REJECT_CODE};
pub use decoder::decode;
pub use error::{ChecksumMismatch, DecodeError, FrameError};
pub use frame::{FrameReader, DEFAULT_MAX_PAYLOAD};
pub use tags::{lookup, lookup_extended, TagKind, TagSpec};
pub use types::{
    PacketType, RawFrame, Record, TagEntry, TagId, TagValue, CHECKSUM_SIZE, HEADER_SIZE,
};

/// Known-good head packet captured from a real terminal, trailing CRC 0x298F.
#[cfg(test)]
pub(crate) mod testdata {
    pub const GOLDEN_FRAME: &[u8] = &[
        0x01, 0x20, 0x00, 0x01, 0x9A, 0x02, 0x18, 0x03, 0x38, 0x36, 0x31, 0x32, 0x33, 0x30, 0x30,
        0x34, 0x33, 0x39, 0x30, 0x37, 0x36, 0x32, 0x36, 0x04, 0x32, 0x00, 0xFE, 0x06, 0x00, 0x01,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x8F, 0x29,
    ];
}
