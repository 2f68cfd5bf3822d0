//! # Voltage SmartBus Error Handling
//!
//! This module provides error handling for the Voltage SmartBus library,
//! covering transport failures, frame-level protocol violations, checksum
//! mismatches, device exception responses and optimizer capacity limits.
//!
//! ## Overview
//!
//! All fallible operations in the library return [`ModbusResult`], a closed
//! sum over [`ModbusError`]. Errors carry enough context to act on: checksum
//! mismatches include both values, capacity overflows include the limit that
//! was hit, exception responses include the originating function code and the
//! Modbus exception code.
//!
//! ## Error Recovery
//!
//! Many errors provide information about recoverability:
//!
//! ```rust
//! use voltage_smartbus::{ModbusError, ModbusResult};
//!
//! fn handle_error(result: ModbusResult<Vec<u16>>) {
//!     match result {
//!         Ok(data) => println!("Success: {:?}", data),
//!         Err(error) => {
//!             if error.is_recoverable() {
//!                 println!("Retryable error: {}", error);
//!             } else {
//!                 println!("Fatal error: {}", error);
//!             }
//!         }
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type alias for Modbus operations
///
/// This is a convenience type alias that uses `ModbusError` as the error type
/// for all Modbus operations, providing consistent error handling throughout
/// the codebase.
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Comprehensive Modbus error types
///
/// This enumeration covers all error conditions that can occur while
/// optimizing, framing, sending and parsing Modbus master requests, from
/// transport-level issues to protocol violations and capacity limits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModbusError {
    /// Invalid parameter detected before any work was done
    ///
    /// # Examples
    /// - Slave ID 0 or above 247
    /// - Empty value list passed to a multiple-write
    #[error("Invalid parameter: {message}")]
    InvalidParam { message: String },

    /// Caller buffer cannot hold the encoded frame or parsed data
    #[error("Buffer too small: need {needed} bytes, have {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// Timeout errors
    ///
    /// Occurs when the transport produced nothing within its deadline, or
    /// reported zero received bytes.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    /// CRC validation failure (RTU)
    ///
    /// Provides both the locally computed and the received CRC values for
    /// debugging line noise or framing slips.
    #[error("CRC validation failed: expected={expected:04X}, actual={actual:04X}")]
    CrcMismatch { expected: u16, actual: u16 },

    /// LRC validation failure (ASCII)
    #[error("LRC validation failed: expected={expected:02X}, actual={actual:02X}")]
    LrcMismatch { expected: u8, actual: u8 },

    /// Frame structure violation
    ///
    /// # Examples
    /// - Frame shorter than the variant minimum
    /// - Missing ':' start byte or CRLF terminator (ASCII)
    /// - Non-zero MBAP protocol identifier (TCP)
    /// - Byte-count field disagreeing with the requested quantity
    /// - Response slave ID differing from the request
    #[error("Invalid frame: {message}")]
    InvalidFrame { message: String },

    /// Modbus exception response
    ///
    /// The slave returned a structurally valid frame whose function code has
    /// the high bit set. Includes the original function code, exception code,
    /// and human-readable description.
    ///
    /// # Standard Exception Codes
    /// - 0x01: Illegal Function
    /// - 0x02: Illegal Data Address
    /// - 0x03: Illegal Data Value
    /// - 0x04: Slave Device Failure
    /// - 0x05: Acknowledge
    /// - 0x06: Slave Device Busy
    /// - 0x08: Memory Parity Error
    /// - 0x0A: Gateway Path Unavailable
    /// - 0x0B: Gateway Target Device Failed to Respond
    #[error("Modbus exception: function={function:02X}, code={code:02X} ({message})")]
    Exception {
        function: u8,
        code: u8,
        message: String,
    },

    /// Transport layer reported a non-timeout send or receive failure
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Invalid or unsupported function code
    #[error("Invalid function code: {code:#04X}")]
    InvalidFunction { code: u8 },

    /// Invalid address range
    ///
    /// # Examples
    /// - Starting address + quantity > 65536
    #[error("Invalid address: start={start}, count={count}")]
    InvalidAddress { start: u16, count: u16 },

    /// Quantity outside the per-function-code limits
    ///
    /// # Examples
    /// - Reading 200 holding registers (max 125)
    /// - Zero quantity in a read request
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: u16 },

    /// Address folding produced more blocks than the configured capacity
    #[error("Too many blocks: {count} exceeds capacity {max}")]
    TooManyBlocks { count: usize, max: usize },

    /// Optimization produced more request plans than the configured capacity
    #[error("Too many plans: {count} exceeds capacity {max}")]
    TooManyPlans { count: usize, max: usize },

    /// Request targets a frame variant disabled at compile time
    #[error("Not supported: {message}")]
    NotSupported { message: String },
}

impl ModbusError {
    /// Create an invalid parameter error
    pub fn invalid_param<S: Into<String>>(message: S) -> Self {
        Self::InvalidParam {
            message: message.into(),
        }
    }

    /// Create a buffer too small error
    pub fn buffer_too_small(needed: usize, capacity: usize) -> Self {
        Self::BufferTooSmall { needed, capacity }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a CRC mismatch error
    pub fn crc_mismatch(expected: u16, actual: u16) -> Self {
        Self::CrcMismatch { expected, actual }
    }

    /// Create an LRC mismatch error
    pub fn lrc_mismatch(expected: u8, actual: u8) -> Self {
        Self::LrcMismatch { expected, actual }
    }

    /// Create a frame error
    pub fn invalid_frame<S: Into<String>>(message: S) -> Self {
        Self::InvalidFrame {
            message: message.into(),
        }
    }

    /// Create a Modbus exception error
    ///
    /// Automatically maps standard exception codes to human-readable messages.
    pub fn exception(function: u8, code: u8) -> Self {
        let message = match code {
            0x01 => "Illegal Function",
            0x02 => "Illegal Data Address",
            0x03 => "Illegal Data Value",
            0x04 => "Slave Device Failure",
            0x05 => "Acknowledge",
            0x06 => "Slave Device Busy",
            0x08 => "Memory Parity Error",
            0x0A => "Gateway Path Unavailable",
            0x0B => "Gateway Target Device Failed to Respond",
            _ => "Unknown Exception",
        }
        .to_string();

        Self::Exception {
            function,
            code,
            message,
        }
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an invalid function error
    pub fn invalid_function(code: u8) -> Self {
        Self::InvalidFunction { code }
    }

    /// Create an invalid address error
    pub fn invalid_address(start: u16, count: u16) -> Self {
        Self::InvalidAddress { start, count }
    }

    /// Create an invalid quantity error
    pub fn invalid_quantity(quantity: u16) -> Self {
        Self::InvalidQuantity { quantity }
    }

    /// Create a not supported error
    pub fn not_supported<S: Into<String>>(message: S) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (can retry)
    ///
    /// The library itself never retries; this lets callers implement their
    /// own retry strategies.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use voltage_smartbus::ModbusError;
    ///
    /// let timeout_error = ModbusError::timeout("read registers", 1000);
    /// assert!(timeout_error.is_recoverable());
    ///
    /// let invalid_function = ModbusError::invalid_function(0x99);
    /// assert!(!invalid_function.is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport { .. } => true,
            Self::CrcMismatch { .. } | Self::LrcMismatch { .. } => true,
            Self::Exception { code, .. } => {
                // Acknowledge, Busy
                matches!(code, 0x05 | 0x06)
            }
            _ => false,
        }
    }

    /// Check if the error is a transport issue
    ///
    /// Identifies errors related to the underlying transport mechanism
    /// rather than Modbus protocol issues.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }

    /// Check if the error is a protocol issue
    ///
    /// Identifies errors related to Modbus frame structure, checksums and
    /// device exception responses.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFrame { .. }
                | Self::CrcMismatch { .. }
                | Self::LrcMismatch { .. }
                | Self::Exception { .. }
                | Self::InvalidFunction { .. }
        )
    }
}

/// Convert from std::io::Error
///
/// Automatically converts standard I/O errors to `ModbusError::Transport`,
/// preserving the original error message for debugging.
impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        Self::transport(err.to_string())
    }
}
