//! Frame checksums: CRC-16/MODBUS for RTU and LRC for ASCII.
//!
//! The CRC is the reflected 0x8005 polynomial (0xA001), initial value 0xFFFF,
//! no final XOR. It covers `[slave_id][function_code][pdu]` and is emitted
//! low byte first on the wire. The LRC is the 8-bit two's complement of the
//! byte sum over the same span, computed on the raw bytes rather than their
//! hex-encoded form.

use crc::{Crc, CRC_16_MODBUS};

/// CRC calculator for RTU frames
const CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Calculate CRC-16/MODBUS over a byte slice.
///
/// An empty slice yields the initial value `0xFFFF`.
pub fn crc16(data: &[u8]) -> u16 {
    CRC_MODBUS.checksum(data)
}

/// Verify the CRC trailer of a complete RTU frame.
///
/// Recomputes the CRC over all but the last two bytes and compares against
/// the trailer interpreted as `(low, high)`.
pub fn crc16_verify(frame: &[u8]) -> bool {
    if frame.len() < 2 {
        return false;
    }
    let (payload, trailer) = frame.split_at(frame.len() - 2);
    let received = u16::from_le_bytes([trailer[0], trailer[1]]);
    crc16(payload) == received
}

/// Calculate the LRC over a byte slice.
///
/// Sum of all bytes, then two's complement of the low byte.
pub fn lrc(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    sum.wrapping_neg()
}

/// Verify the LRC trailer of a binary frame body.
///
/// Recomputes over all but the trailing check byte.
pub fn lrc_verify(frame: &[u8]) -> bool {
    if frame.len() < 2 {
        return false;
    }
    let (payload, trailer) = frame.split_at(frame.len() - 1);
    lrc(payload) == trailer[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_empty() {
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_crc16_single_byte() {
        assert_eq!(crc16(&[0x01]), 0x807E);
    }

    #[test]
    fn test_crc16_read_request() {
        // Slave 1, FC03, start 0x0000, quantity 0x0002. The wire trailer is
        // C4 0B (little-endian), so the CRC value is 0x0BC4.
        let data = [0x01, 0x03, 0x00, 0x00, 0x00, 0x02];
        assert_eq!(crc16(&data), 0x0BC4);
    }

    #[test]
    fn test_crc16_spec_example() {
        // Slave 17, FC03, start 0x006B, quantity 0x0003 -> trailer 76 87.
        let data = [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03];
        assert_eq!(crc16(&data), 0x8776);
    }

    #[test]
    fn test_crc16_verify_round_trip() {
        let mut frame = vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x02];
        let crc = crc16(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        assert_eq!(&frame[6..], &[0xC4, 0x0B]);
        assert!(crc16_verify(&frame));

        // Flip one payload bit, verification must fail
        frame[2] ^= 0x01;
        assert!(!crc16_verify(&frame));
    }

    #[test]
    fn test_crc16_verify_short_frame() {
        assert!(!crc16_verify(&[0x01]));
        assert!(!crc16_verify(&[]));
    }

    #[test]
    fn test_lrc_basic() {
        assert_eq!(lrc(&[]), 0x00);
        assert_eq!(lrc(&[0x01]), 0xFF);
        // Slave 1, FC03, 00 00 00 02 -> sum 6 -> LRC 0xFA
        assert_eq!(lrc(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x02]), 0xFA);
    }

    #[test]
    fn test_lrc_wrapping_sum() {
        // Sum wraps past 0xFF: 0x80 + 0x80 = 0x00 -> LRC 0x00
        assert_eq!(lrc(&[0x80, 0x80]), 0x00);
        // 0xFF + 0x01 = 0x00 -> LRC 0x00
        assert_eq!(lrc(&[0xFF, 0x01]), 0x00);
    }

    #[test]
    fn test_lrc_verify_round_trip() {
        let mut frame = vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x02];
        frame.push(lrc(&frame));
        assert!(lrc_verify(&frame));

        frame[1] ^= 0x10;
        assert!(!lrc_verify(&frame));
    }
}
