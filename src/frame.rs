//! Frame codec for the three Modbus variants.
//!
//! The wire formats, byte for byte:
//!
//! ```text
//! RTU:   [slave][fc][pdu...][crc_lo][crc_hi]
//! ASCII: [':'][slave:2hex][fc:2hex][pdu:2N hex][lrc:2hex][CR][LF]
//! TCP:   [tx_hi][tx_lo][0x00][0x00][len_hi][len_lo][unit][fc][pdu...]
//! ```
//!
//! Encoders write into a caller-supplied buffer and return the frame length;
//! decoders return the recovered `(slave, fc, pdu)` plus the transaction id
//! for TCP. Variants are individually selectable through the `rtu`, `ascii`
//! and `tcp` cargo features; a disabled variant answers `NotSupported`.

use crate::error::{ModbusError, ModbusResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "rtu")]
use crate::checksum;

/// Modbus protocol mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModbusMode {
    /// Modbus RTU (binary, CRC16 trailer)
    Rtu,
    /// Modbus ASCII (hex encoded, LRC trailer)
    Ascii,
    /// Modbus TCP/IP (MBAP header)
    Tcp,
}

impl ModbusMode {
    /// Serial modes carry an inter-frame gap; TCP does not.
    pub fn is_serial(self) -> bool {
        matches!(self, ModbusMode::Rtu | ModbusMode::Ascii)
    }
}

impl fmt::Display for ModbusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModbusMode::Rtu => "RTU",
            ModbusMode::Ascii => "ASCII",
            ModbusMode::Tcp => "TCP",
        };
        write!(f, "{}", name)
    }
}

/// A decoded wire frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Slave / unit identifier
    pub slave_id: u8,
    /// Function code as received; the high bit flags an exception response
    pub function: u8,
    /// PDU payload after the function code
    pub pdu: Vec<u8>,
    /// MBAP transaction id (TCP only)
    pub transaction_id: Option<u16>,
}

/// Full frame length for a PDU of `pdu_length` bytes under `mode`.
pub fn frame_length(mode: ModbusMode, pdu_length: usize) -> ModbusResult<usize> {
    match mode {
        #[cfg(feature = "rtu")]
        ModbusMode::Rtu => Ok(2 + pdu_length + 2),
        #[cfg(feature = "ascii")]
        ModbusMode::Ascii => Ok(1 + 2 + 2 + pdu_length * 2 + 2 + 2),
        #[cfg(feature = "tcp")]
        ModbusMode::Tcp => Ok(7 + 1 + pdu_length),
        #[allow(unreachable_patterns)]
        _ => Err(disabled_mode(mode)),
    }
}

/// Encode a frame for `mode` into `out`, returning the frame length.
///
/// `transaction_id` is only consumed by the TCP variant.
pub fn encode_frame(
    mode: ModbusMode,
    transaction_id: u16,
    slave_id: u8,
    function: u8,
    pdu: &[u8],
    out: &mut [u8],
) -> ModbusResult<usize> {
    if pdu.len() > crate::MAX_PDU_CHARS {
        return Err(ModbusError::invalid_param(format!(
            "PDU length {} exceeds maximum {}",
            pdu.len(),
            crate::MAX_PDU_CHARS
        )));
    }

    match mode {
        #[cfg(feature = "rtu")]
        ModbusMode::Rtu => encode_rtu(slave_id, function, pdu, out),
        #[cfg(feature = "ascii")]
        ModbusMode::Ascii => encode_ascii(slave_id, function, pdu, out),
        #[cfg(feature = "tcp")]
        ModbusMode::Tcp => encode_tcp(transaction_id, slave_id, function, pdu, out),
        #[allow(unreachable_patterns)]
        _ => {
            let _ = transaction_id;
            Err(disabled_mode(mode))
        }
    }
}

/// Decode a complete wire frame for `mode`.
pub fn decode_frame(mode: ModbusMode, frame: &[u8]) -> ModbusResult<DecodedFrame> {
    match mode {
        #[cfg(feature = "rtu")]
        ModbusMode::Rtu => decode_rtu(frame),
        #[cfg(feature = "ascii")]
        ModbusMode::Ascii => decode_ascii(frame),
        #[cfg(feature = "tcp")]
        ModbusMode::Tcp => decode_tcp(frame),
        #[allow(unreachable_patterns)]
        _ => Err(disabled_mode(mode)),
    }
}

#[allow(dead_code)]
fn disabled_mode(mode: ModbusMode) -> ModbusError {
    ModbusError::not_supported(format!("{} support is disabled at compile time", mode))
}

// ============================================================================
// RTU
// ============================================================================

/// Encode an RTU frame: `[slave][fc][pdu...][crc_lo][crc_hi]`.
#[cfg(feature = "rtu")]
pub fn encode_rtu(slave_id: u8, function: u8, pdu: &[u8], out: &mut [u8]) -> ModbusResult<usize> {
    let needed = 2 + pdu.len() + 2;
    if out.len() < needed {
        return Err(ModbusError::buffer_too_small(needed, out.len()));
    }

    out[0] = slave_id;
    out[1] = function;
    out[2..2 + pdu.len()].copy_from_slice(pdu);

    let crc = checksum::crc16(&out[..2 + pdu.len()]);
    out[2 + pdu.len()] = (crc & 0xFF) as u8;
    out[2 + pdu.len() + 1] = (crc >> 8) as u8;

    Ok(needed)
}

/// Decode an RTU frame, verifying the CRC trailer.
#[cfg(feature = "rtu")]
pub fn decode_rtu(frame: &[u8]) -> ModbusResult<DecodedFrame> {
    // Minimum: slave + fc + CRC
    if frame.len() < 4 {
        return Err(ModbusError::invalid_frame(format!(
            "RTU frame too short: {} bytes",
            frame.len()
        )));
    }

    let payload = &frame[..frame.len() - 2];
    let expected = checksum::crc16(payload);
    let actual = u16::from_le_bytes([frame[frame.len() - 2], frame[frame.len() - 1]]);
    if expected != actual {
        return Err(ModbusError::crc_mismatch(expected, actual));
    }

    Ok(DecodedFrame {
        slave_id: frame[0],
        function: frame[1],
        pdu: frame[2..frame.len() - 2].to_vec(),
        transaction_id: None,
    })
}

// ============================================================================
// ASCII
// ============================================================================

#[cfg(feature = "ascii")]
const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

#[cfg(feature = "ascii")]
fn put_hex(out: &mut [u8], pos: usize, byte: u8) {
    out[pos] = HEX_UPPER[(byte >> 4) as usize];
    out[pos + 1] = HEX_UPPER[(byte & 0x0F) as usize];
}

/// Decode a single case-insensitive hex pair.
#[cfg(feature = "ascii")]
fn hex_pair(hi: u8, lo: u8) -> ModbusResult<u8> {
    fn nibble(c: u8) -> ModbusResult<u8> {
        match c {
            b'0'..=b'9' => Ok(c - b'0'),
            b'A'..=b'F' => Ok(c - b'A' + 10),
            b'a'..=b'f' => Ok(c - b'a' + 10),
            _ => Err(ModbusError::invalid_frame(format!(
                "non-hex character 0x{:02X} in ASCII frame",
                c
            ))),
        }
    }
    Ok((nibble(hi)? << 4) | nibble(lo)?)
}

/// Encode an ASCII frame: `[':'][slave][fc][pdu][lrc]` in uppercase hex,
/// terminated with CR LF. The LRC covers the raw bytes, not their hex form.
#[cfg(feature = "ascii")]
pub fn encode_ascii(slave_id: u8, function: u8, pdu: &[u8], out: &mut [u8]) -> ModbusResult<usize> {
    let needed = 1 + 2 + 2 + pdu.len() * 2 + 2 + 2;
    if out.len() < needed {
        return Err(ModbusError::buffer_too_small(needed, out.len()));
    }

    out[0] = b':';
    put_hex(out, 1, slave_id);
    put_hex(out, 3, function);

    let mut pos = 5;
    let mut lrc = slave_id.wrapping_add(function);
    for &byte in pdu {
        put_hex(out, pos, byte);
        lrc = lrc.wrapping_add(byte);
        pos += 2;
    }

    put_hex(out, pos, lrc.wrapping_neg());
    pos += 2;
    out[pos] = b'\r';
    out[pos + 1] = b'\n';

    Ok(needed)
}

/// Decode an ASCII frame, accepting lowercase hex, verifying the LRC.
#[cfg(feature = "ascii")]
pub fn decode_ascii(frame: &[u8]) -> ModbusResult<DecodedFrame> {
    // Minimum: ':' + slave(2) + fc(2) + LRC(2) + CRLF
    if frame.len() < 9 {
        return Err(ModbusError::invalid_frame(format!(
            "ASCII frame too short: {} bytes",
            frame.len()
        )));
    }
    if frame[0] != b':' {
        return Err(ModbusError::invalid_frame("ASCII frame missing ':' start"));
    }
    if frame[frame.len() - 2] != b'\r' || frame[frame.len() - 1] != b'\n' {
        return Err(ModbusError::invalid_frame(
            "ASCII frame missing CRLF terminator",
        ));
    }

    let hex_len = frame.len() - 3; // strip ':', CR, LF
    if hex_len % 2 != 0 {
        return Err(ModbusError::invalid_frame("ASCII frame has odd hex length"));
    }

    let slave_id = hex_pair(frame[1], frame[2])?;
    let function = hex_pair(frame[3], frame[4])?;

    let pdu_hex = &frame[5..frame.len() - 4];
    let mut pdu = Vec::with_capacity(pdu_hex.len() / 2);
    let mut lrc = slave_id.wrapping_add(function);
    for pair in pdu_hex.chunks_exact(2) {
        let byte = hex_pair(pair[0], pair[1])?;
        lrc = lrc.wrapping_add(byte);
        pdu.push(byte);
    }

    let expected = lrc.wrapping_neg();
    let actual = hex_pair(frame[frame.len() - 4], frame[frame.len() - 3])?;
    if expected != actual {
        return Err(ModbusError::lrc_mismatch(expected, actual));
    }

    Ok(DecodedFrame {
        slave_id,
        function,
        pdu,
        transaction_id: None,
    })
}

// ============================================================================
// TCP
// ============================================================================

/// Encode a TCP frame with the MBAP header.
///
/// The length field counts unit id + function code + PDU.
#[cfg(feature = "tcp")]
pub fn encode_tcp(
    transaction_id: u16,
    unit_id: u8,
    function: u8,
    pdu: &[u8],
    out: &mut [u8],
) -> ModbusResult<usize> {
    let needed = 7 + 1 + pdu.len();
    if out.len() < needed {
        return Err(ModbusError::buffer_too_small(needed, out.len()));
    }

    out[0..2].copy_from_slice(&transaction_id.to_be_bytes());
    out[2..4].copy_from_slice(&0u16.to_be_bytes());
    let length = (1 + 1 + pdu.len()) as u16;
    out[4..6].copy_from_slice(&length.to_be_bytes());
    out[6] = unit_id;
    out[7] = function;
    out[8..8 + pdu.len()].copy_from_slice(pdu);

    Ok(needed)
}

/// Decode a TCP frame, checking the protocol id and the length field.
#[cfg(feature = "tcp")]
pub fn decode_tcp(frame: &[u8]) -> ModbusResult<DecodedFrame> {
    // Minimum: MBAP(7) + fc
    if frame.len() < 8 {
        return Err(ModbusError::invalid_frame(format!(
            "TCP frame too short: {} bytes",
            frame.len()
        )));
    }

    let transaction_id = u16::from_be_bytes([frame[0], frame[1]]);
    let protocol_id = u16::from_be_bytes([frame[2], frame[3]]);
    if protocol_id != 0 {
        return Err(ModbusError::invalid_frame(format!(
            "non-zero MBAP protocol id {:#06X}",
            protocol_id
        )));
    }

    let length = u16::from_be_bytes([frame[4], frame[5]]) as usize;
    if 6 + length != frame.len() {
        return Err(ModbusError::invalid_frame(format!(
            "MBAP length {} disagrees with frame length {}",
            length,
            frame.len()
        )));
    }

    Ok(DecodedFrame {
        slave_id: frame[6],
        function: frame[7],
        pdu: frame[8..].to_vec(),
        transaction_id: Some(transaction_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const READ_PDU: [u8; 4] = [0x00, 0x00, 0x00, 0x02];

    #[cfg(feature = "rtu")]
    mod rtu {
        use super::super::*;
        use super::READ_PDU;

        #[test]
        fn test_encode() {
            let mut buf = [0u8; 64];
            let len = encode_rtu(0x01, 0x03, &READ_PDU, &mut buf).unwrap();
            assert_eq!(
                &buf[..len],
                &[0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B]
            );
        }

        #[test]
        fn test_decode() {
            let frame = [0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B];
            let decoded = decode_rtu(&frame).unwrap();
            assert_eq!(decoded.slave_id, 0x01);
            assert_eq!(decoded.function, 0x03);
            assert_eq!(decoded.pdu, READ_PDU);
            assert_eq!(decoded.transaction_id, None);
        }

        #[test]
        fn test_decode_crc_mismatch() {
            let frame = [0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0C];
            assert!(matches!(
                decode_rtu(&frame),
                Err(ModbusError::CrcMismatch { .. })
            ));
        }

        #[test]
        fn test_decode_too_short() {
            assert!(matches!(
                decode_rtu(&[0x01, 0x03, 0xC4]),
                Err(ModbusError::InvalidFrame { .. })
            ));
        }

        #[test]
        fn test_encode_buffer_too_small() {
            let mut buf = [0u8; 6];
            assert!(matches!(
                encode_rtu(0x01, 0x03, &READ_PDU, &mut buf),
                Err(ModbusError::BufferTooSmall {
                    needed: 8,
                    capacity: 6
                })
            ));
        }

        #[test]
        fn test_round_trip_empty_pdu() {
            let mut buf = [0u8; 8];
            let len = encode_rtu(0x11, 0x2B, &[], &mut buf).unwrap();
            assert_eq!(len, 4);
            let decoded = decode_rtu(&buf[..len]).unwrap();
            assert_eq!(decoded.slave_id, 0x11);
            assert_eq!(decoded.function, 0x2B);
            assert!(decoded.pdu.is_empty());
        }
    }

    #[cfg(feature = "ascii")]
    mod ascii {
        use super::super::*;
        use super::READ_PDU;

        #[test]
        fn test_encode() {
            let mut buf = [0u8; 64];
            let len = encode_ascii(0x01, 0x03, &READ_PDU, &mut buf).unwrap();
            assert_eq!(len, 17);
            assert_eq!(&buf[..len], b":010300000002FA\r\n");
        }

        #[test]
        fn test_decode() {
            let decoded = decode_ascii(b":010300000002FA\r\n").unwrap();
            assert_eq!(decoded.slave_id, 0x01);
            assert_eq!(decoded.function, 0x03);
            assert_eq!(decoded.pdu, READ_PDU);
        }

        #[test]
        fn test_decode_lowercase_hex() {
            let decoded = decode_ascii(b":010300000002fa\r\n").unwrap();
            assert_eq!(decoded.pdu, READ_PDU);
        }

        #[test]
        fn test_decode_lrc_mismatch() {
            assert!(matches!(
                decode_ascii(b":010300000002FF\r\n"),
                Err(ModbusError::LrcMismatch { .. })
            ));
        }

        #[test]
        fn test_decode_missing_start() {
            assert!(matches!(
                decode_ascii(b"010300000002FA\r\n"),
                Err(ModbusError::InvalidFrame { .. })
            ));
        }

        #[test]
        fn test_decode_missing_crlf() {
            assert!(matches!(
                decode_ascii(b":010300000002FA\r\r"),
                Err(ModbusError::InvalidFrame { .. })
            ));
        }

        #[test]
        fn test_decode_non_hex() {
            assert!(matches!(
                decode_ascii(b":01030000000ZFA\r\n"),
                Err(ModbusError::InvalidFrame { .. })
            ));
        }

        #[test]
        fn test_round_trip_empty_pdu() {
            let mut buf = [0u8; 16];
            let len = encode_ascii(0x01, 0x07, &[], &mut buf).unwrap();
            assert_eq!(len, 9);
            let decoded = decode_ascii(&buf[..len]).unwrap();
            assert_eq!(decoded.function, 0x07);
            assert!(decoded.pdu.is_empty());
        }
    }

    #[cfg(feature = "tcp")]
    mod tcp {
        use super::super::*;
        use super::READ_PDU;

        #[test]
        fn test_encode() {
            let mut buf = [0u8; 64];
            let len = encode_tcp(0x1234, 0x01, 0x03, &READ_PDU, &mut buf).unwrap();
            assert_eq!(len, 12);
            assert_eq!(
                &buf[..8],
                &[0x12, 0x34, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03]
            );
            assert_eq!(&buf[8..12], &READ_PDU);
        }

        #[test]
        fn test_decode() {
            let frame = [
                0x12, 0x34, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x02,
            ];
            let decoded = decode_tcp(&frame).unwrap();
            assert_eq!(decoded.transaction_id, Some(0x1234));
            assert_eq!(decoded.slave_id, 0x01);
            assert_eq!(decoded.function, 0x03);
            assert_eq!(decoded.pdu, READ_PDU);
        }

        #[test]
        fn test_decode_bad_protocol_id() {
            let frame = [
                0x12, 0x34, 0x00, 0x01, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x02,
            ];
            assert!(matches!(
                decode_tcp(&frame),
                Err(ModbusError::InvalidFrame { .. })
            ));
        }

        #[test]
        fn test_decode_length_mismatch() {
            let frame = [
                0x12, 0x34, 0x00, 0x00, 0x00, 0x07, 0x01, 0x03, 0x00, 0x00, 0x00, 0x02,
            ];
            assert!(matches!(
                decode_tcp(&frame),
                Err(ModbusError::InvalidFrame { .. })
            ));
        }

        #[test]
        fn test_decode_too_short() {
            assert!(matches!(
                decode_tcp(&[0x12, 0x34, 0x00, 0x00, 0x00, 0x02, 0x01]),
                Err(ModbusError::InvalidFrame { .. })
            ));
        }
    }

    #[test]
    fn test_dispatch_round_trip_all_modes() {
        let modes: &[ModbusMode] = &[
            #[cfg(feature = "rtu")]
            ModbusMode::Rtu,
            #[cfg(feature = "ascii")]
            ModbusMode::Ascii,
            #[cfg(feature = "tcp")]
            ModbusMode::Tcp,
        ];

        let pdu = [0x00, 0x6B, 0x00, 0x03];
        let mut buf = [0u8; 600];
        for &mode in modes {
            let len = encode_frame(mode, 0x0001, 0x11, 0x03, &pdu, &mut buf).unwrap();
            assert_eq!(len, frame_length(mode, pdu.len()).unwrap());
            let decoded = decode_frame(mode, &buf[..len]).unwrap();
            assert_eq!(decoded.slave_id, 0x11);
            assert_eq!(decoded.function, 0x03);
            assert_eq!(decoded.pdu, pdu);
        }
    }

    #[test]
    fn test_dispatch_round_trip_max_pdu() {
        let pdu = vec![0xA5u8; crate::MAX_PDU_CHARS];
        let mut buf = vec![0u8; crate::FRAME_BUFFER_SIZE];
        let modes: &[ModbusMode] = &[
            #[cfg(feature = "rtu")]
            ModbusMode::Rtu,
            #[cfg(feature = "ascii")]
            ModbusMode::Ascii,
            #[cfg(feature = "tcp")]
            ModbusMode::Tcp,
        ];
        for &mode in modes {
            let len = encode_frame(mode, 7, 1, 0x03, &pdu, &mut buf).unwrap();
            let decoded = decode_frame(mode, &buf[..len]).unwrap();
            assert_eq!(decoded.pdu, pdu);
        }
    }

    #[test]
    fn test_encode_rejects_oversized_pdu() {
        let pdu = vec![0u8; crate::MAX_PDU_CHARS + 1];
        let mut buf = vec![0u8; 600];
        let result = encode_frame(ModbusMode::Tcp, 0, 1, 0x03, &pdu, &mut buf);
        assert!(matches!(result, Err(ModbusError::InvalidParam { .. })));
    }
}
