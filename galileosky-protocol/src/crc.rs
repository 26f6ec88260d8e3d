//! CRC-16/MODBUS checksum used by the terminal protocol.
//!
//! Bit-serial and table-free: register starts at 0xFFFF, each input byte is
//! XORed into the low byte, then eight shift-right steps apply the reflected
//! polynomial 0xA001. The terminal computes this over header + length +
//! payload and appends it little-endian; the same value is echoed back to the
//! terminal in the success confirmation.

/// Compute the CRC-16/MODBUS checksum of `data`.
pub fn checksum(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Verify a complete frame: recompute over everything up to the trailing
/// checksum field and compare against that field (little-endian).
pub fn verify(frame: &[u8]) -> bool {
    if frame.len() < 2 {
        return false;
    }
    let (body, tail) = frame.split_at(frame.len() - 2);
    checksum(body) == u16::from_le_bytes([tail[0], tail[1]])
}
