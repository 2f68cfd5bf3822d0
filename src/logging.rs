//! Callback-based logging for master traffic.
//!
//! Applications attach a [`CallbackLogger`] to the master to observe
//! requests, responses and raw wire frames without committing to a specific
//! logging backend. Frame dumps are variant-aware: ASCII frames render as
//! the text they are, TCP frames carry their transaction id, binary frames
//! hex-dump. The console logger is a ready-made sink for quick diagnostics.

use crate::frame::ModbusMode;
use crate::utils::format::{bytes_to_hex, registers_to_hex};
use std::sync::Arc;

/// Severity of a log line, ascending.
///
/// The derived ordering drives filtering: a line is emitted when its level
/// is at or above the logger's threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Frame dumps and per-plan detail
    Debug,
    /// Request/response summaries
    Info,
    /// Suspicious but non-fatal conditions
    Warn,
    /// Failed operations
    Error,
}

impl LogLevel {
    /// Convert log level to string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Logging mode for traffic display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// Show raw frame data only
    Raw,
    /// Show interpreted request/response fields
    Interpreted,
    /// Show both raw and interpreted data
    Both,
}

/// Type alias for log callback functions
///
/// The callback receives a log level and message string
pub type LogCallback = Box<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Logger that routes master traffic to a user callback
///
/// A logger without a sink drops everything; [`CallbackLogger::disabled`]
/// is the cheap default the master accepts.
#[derive(Clone)]
pub struct CallbackLogger {
    sink: Option<Arc<LogCallback>>,
    threshold: LogLevel,
    mode: LoggingMode,
}

impl CallbackLogger {
    /// Create a logger emitting into `callback` at `threshold` and above.
    pub fn new(callback: LogCallback, threshold: LogLevel) -> Self {
        Self {
            sink: Some(Arc::new(callback)),
            threshold,
            mode: LoggingMode::Interpreted,
        }
    }

    /// Create a logger with an explicit traffic display mode.
    pub fn with_mode(callback: LogCallback, threshold: LogLevel, mode: LoggingMode) -> Self {
        Self {
            sink: Some(Arc::new(callback)),
            threshold,
            mode,
        }
    }

    /// Create a logger printing to the console.
    ///
    /// Warnings and errors go to stderr, everything else to stdout.
    pub fn console() -> Self {
        let callback: LogCallback = Box::new(|level, message| {
            let timestamp = chrono::Utc::now().format("%H:%M:%S%.3f");
            let line = format!("{} smartbus {:5} {}", timestamp, level.as_str(), message);
            if level >= LogLevel::Warn {
                eprintln!("{}", line);
            } else {
                println!("{}", line);
            }
        });
        Self::new(callback, LogLevel::Info)
    }

    /// Create a logger that outputs nothing.
    pub fn disabled() -> Self {
        Self {
            sink: None,
            threshold: LogLevel::Error,
            mode: LoggingMode::Interpreted,
        }
    }

    /// Set logging mode
    pub fn set_mode(&mut self, mode: LoggingMode) {
        self.mode = mode;
    }

    /// Get current logging mode
    pub fn mode(&self) -> LoggingMode {
        self.mode
    }

    /// Log a message at the specified level
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.threshold {
            return;
        }
        if let Some(ref sink) = self.sink {
            sink(level, message);
        }
    }

    /// Log an error message
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Log a warning message
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Log an info message
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Log a debug message
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Log a raw wire frame.
    ///
    /// ASCII frames are printable and render as text with the CRLF trimmed;
    /// TCP frames dump as contiguous hex with their MBAP transaction id
    /// pulled out front; RTU frames get a spaced hex dump.
    pub fn log_frame(&self, direction: &str, mode: ModbusMode, frame: &[u8]) {
        if !matches!(self.mode, LoggingMode::Raw | LoggingMode::Both) {
            return;
        }
        let rendered = match mode {
            ModbusMode::Ascii => String::from_utf8_lossy(frame).trim_end().to_string(),
            ModbusMode::Tcp if frame.len() >= 2 => format!(
                "tx={:#06X} {}",
                u16::from_be_bytes([frame[0], frame[1]]),
                hex::encode_upper(frame)
            ),
            _ => bytes_to_hex(frame),
        };
        let message = format!(
            "{} {} frame ({} bytes): {}",
            direction,
            mode,
            frame.len(),
            rendered
        );
        self.debug(&message);
    }

    /// Log an outgoing request
    pub fn log_request(&self, slave_id: u8, function: u8, address: u16, quantity: u16) {
        if !matches!(self.mode, LoggingMode::Interpreted | LoggingMode::Both) {
            return;
        }
        let message = format!(
            "Modbus Request -> Slave: {}, Function: {} (0x{:02X}), Address: {}, Quantity: {}",
            slave_id,
            function_name(function),
            function,
            address,
            quantity
        );
        self.info(&message);
    }

    /// Log an incoming response
    pub fn log_response(&self, slave_id: u8, function: u8, pdu: &[u8]) {
        if !matches!(self.mode, LoggingMode::Interpreted | LoggingMode::Both) {
            return;
        }
        let message = format!(
            "Modbus Response <- Slave: {}, Function: {} (0x{:02X}), {}",
            slave_id,
            function_name(function & 0x7F),
            function,
            interpret_response(function, pdu)
        );
        self.info(&message);
    }
}

impl Default for CallbackLogger {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Get human-readable function name
fn function_name(function: u8) -> &'static str {
    match function {
        0x01 => "Read Coils",
        0x02 => "Read Discrete Inputs",
        0x03 => "Read Holding Registers",
        0x04 => "Read Input Registers",
        0x05 => "Write Single Coil",
        0x06 => "Write Single Register",
        0x0F => "Write Multiple Coils",
        0x10 => "Write Multiple Registers",
        0x16 => "Mask Write Register",
        0x17 => "Read/Write Multiple Registers",
        _ => "Unknown Function",
    }
}

/// Interpret a response PDU for display
fn interpret_response(function: u8, pdu: &[u8]) -> String {
    if function & 0x80 != 0 {
        return match pdu.first() {
            Some(code) => format!("Exception: 0x{:02X}", code),
            None => "Exception (no code)".to_string(),
        };
    }
    if pdu.is_empty() {
        return "No data".to_string();
    }

    match function {
        0x01 | 0x02 => {
            let byte_count = pdu[0];
            format!(
                "Byte count: {}, Coil bytes: {}",
                byte_count,
                bytes_to_hex(&pdu[1..])
            )
        }
        0x03 | 0x04 => {
            let byte_count = pdu[0];
            let registers: Vec<u16> = pdu[1..]
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            format!(
                "Byte count: {}, Registers: {}",
                byte_count,
                registers_to_hex(&registers)
            )
        }
        0x05 | 0x06 | 0x0F | 0x10 => {
            if pdu.len() >= 4 {
                let address = u16::from_be_bytes([pdu[0], pdu[1]]);
                let value = u16::from_be_bytes([pdu[2], pdu[3]]);
                format!("Address: {}, Value: 0x{:04X}", address, value)
            } else {
                format!("Data: {}", bytes_to_hex(pdu))
            }
        }
        _ => format!("Data: {}", bytes_to_hex(pdu)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_logger(mode: LoggingMode) -> (CallbackLogger, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = counter.clone();
        let callback: LogCallback = Box::new(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (
            CallbackLogger::with_mode(callback, LogLevel::Debug, mode),
            counter,
        )
    }

    #[test]
    fn test_disabled_logger_emits_nothing() {
        let logger = CallbackLogger::disabled();
        logger.error("nothing happens");
        logger.log_request(1, 0x03, 0, 10);
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Error > LogLevel::Warn);
        assert!(LogLevel::Warn > LogLevel::Info);
        assert!(LogLevel::Info > LogLevel::Debug);
    }

    #[test]
    fn test_threshold_filtering() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = counter.clone();
        let callback: LogCallback = Box::new(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let logger = CallbackLogger::new(callback, LogLevel::Warn);

        logger.error("counted");
        logger.warn("counted");
        logger.info("filtered");
        logger.debug("filtered");

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_mode_selects_outputs() {
        let (logger, counter) = counting_logger(LoggingMode::Interpreted);
        logger.log_frame("TX", ModbusMode::Rtu, &[0x01, 0x02]);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        logger.log_request(1, 0x03, 0, 10);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let (logger, counter) = counting_logger(LoggingMode::Raw);
        logger.log_request(1, 0x03, 0, 10);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        logger.log_frame("TX", ModbusMode::Rtu, &[0x01, 0x02]);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let (logger, counter) = counting_logger(LoggingMode::Both);
        logger.log_request(1, 0x03, 0, 10);
        logger.log_frame("TX", ModbusMode::Rtu, &[0x01, 0x02]);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_frame_rendering_per_mode() {
        let lines = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = lines.clone();
        let callback: LogCallback = Box::new(move |_, message| {
            sink.lock().unwrap().push(message.to_string());
        });
        let logger = CallbackLogger::with_mode(callback, LogLevel::Debug, LoggingMode::Raw);

        logger.log_frame("TX", ModbusMode::Ascii, b":010300000002FA\r\n");
        logger.log_frame(
            "TX",
            ModbusMode::Tcp,
            &[0x12, 0x34, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x02],
        );
        logger.log_frame("RX", ModbusMode::Rtu, &[0x01, 0x03]);

        let lines = lines.lock().unwrap();
        assert!(lines[0].contains(":010300000002FA"));
        assert!(!lines[0].contains('\r'));
        assert!(lines[1].contains("tx=0x1234"));
        assert!(lines[1].contains("123400000006"));
        assert!(lines[2].contains("01 03"));
    }

    #[test]
    fn test_interpret_response_registers_decoded() {
        let text = interpret_response(0x03, &[0x04, 0x12, 0x34, 0x00, 0x0A]);
        assert!(text.contains("Byte count: 4"));
        assert!(text.contains("1234 000A"));
    }

    #[test]
    fn test_interpret_exception() {
        assert!(interpret_response(0x83, &[0x02]).contains("Exception"));
    }
}
