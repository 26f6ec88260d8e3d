//! Error types for the Galileosky wire protocol.

use thiserror::Error;

/// Structural failures while decoding the tag stream of one frame.
///
/// Every variant is fatal to that frame only: the frame is answered with the
/// rejection confirmation and the connection keeps reading. None of them is
/// ever recovered by guessing a tag width — one wrong width turns every
/// following data byte into a phantom tag.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A tag id absent from the registry was encountered.
    #[error("unknown tag 0x{tag:02X} at payload offset {offset}")]
    UnknownTag { tag: u8, offset: usize },

    /// A 2-byte sub-tag inside an extended block was not in the sub-tag registry.
    #[error("unknown extended tag 0x{tag:04X} at payload offset {offset}")]
    UnknownExtendedTag { tag: u16, offset: usize },

    /// An extended block's nested stream does not consume exactly its declared length.
    #[error(
        "extended block at offset {offset} declares {declared} bytes, nested tags need {consumed}"
    )]
    MalformedExtendedBlock {
        offset: usize,
        declared: usize,
        consumed: usize,
    },

    /// A tag's fixed width extends past the end of the payload.
    #[error("tag 0x{tag:04X} at offset {offset} needs {needed} bytes, {available} left in payload")]
    TruncatedPayload {
        tag: u16,
        offset: usize,
        needed: usize,
        available: usize,
    },
}

/// Failures while reassembling frames from the connection byte stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Declared payload length exceeds the configured maximum.
    ///
    /// Fatal to the connection: once the length field is corrupt there is no
    /// way to find the next frame boundary, so the caller must close rather
    /// than buffer without bound.
    #[error("declared payload length {declared} exceeds maximum {max}")]
    FrameTooLarge { declared: usize, max: usize },
}

/// Checksum verification failure for a fully buffered frame.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("checksum mismatch: computed 0x{computed:04X}, frame carries 0x{received:04X}")]
pub struct ChecksumMismatch {
    pub computed: u16,
    pub received: u16,
}
