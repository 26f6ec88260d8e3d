//! Confirmation replies sent back to the terminal.
//!
//! Every completely framed packet is answered with exactly one 3-byte reply,
//! written on the same connection in arrival order. The terminal decides
//! whether to retransmit based on this reply, so no frame-scoped failure may
//! ever go unanswered.

use crate::crc;
use crate::types::CHECKSUM_SIZE;

/// Header byte of every confirmation reply.
pub const ACK_HEADER: u8 = 0x02;

/// Fixed code sent when a frame is structurally rejected (wire bytes `3F 00`).
pub const REJECT_CODE: u16 = 0x003F;

/// Outcome of processing one frame, as far as the terminal needs to know.
///
/// Only structural results count here: a frame whose records carry
/// semantically odd values is still [`Accepted`](FrameOutcome::Accepted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Checksum verified and the payload decoded structurally.
    Accepted,
    /// Checksum mismatch or any structural decode failure.
    Rejected,
}

/// Build the 3-byte confirmation for a processed frame.
///
/// `frame_bytes` is the complete frame including its trailing checksum. On
/// acceptance the frame's checksum is recomputed and echoed back,
/// little-endian, proving to the terminal that its exact bytes arrived
/// intact. On rejection the fixed code is sent instead — a constant, not a
/// checksum — signalling retransmission without identifying the bytes.
pub fn confirmation(frame_bytes: &[u8], outcome: FrameOutcome) -> [u8; 3] {
    let code = match outcome {
        FrameOutcome::Accepted => {
            crc::checksum(&frame_bytes[..frame_bytes.len() - CHECKSUM_SIZE])
        }
        FrameOutcome::Rejected => REJECT_CODE,
    };
    let [lo, hi] = code.to_le_bytes();
    [ACK_HEADER, lo, hi]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::GOLDEN_FRAME;

    #[test]
    fn success_echoes_frame_checksum() {
        let reply = confirmation(GOLDEN_FRAME, FrameOutcome::Accepted);
        assert_eq!(reply, [0x02, 0x8F, 0x29]);
    }

    #[test]
    fn rejection_is_a_fixed_sentinel() {
        let reply = confirmation(GOLDEN_FRAME, FrameOutcome::Rejected);
        assert_eq!(reply, [0x02, 0x3F, 0x00]);

        // Same reply for any other frame bytes.
        let mut corrupted = GOLDEN_FRAME.to_vec();
        corrupted[4] ^= 0xFF;
        assert_eq!(confirmation(&corrupted, FrameOutcome::Rejected), reply);
    }
}
