//! Utility functions and helpers.
//!
//! Validation of user-supplied parameters, formatting for logs and
//! diagnostics, and a lightweight operation timer.

use crate::error::{ModbusError, ModbusResult};
use log::debug;
use std::time::{Duration, Instant};

/// Data validation utilities
pub mod validation {
    use super::*;

    /// Validate slave ID (1-247)
    pub fn validate_slave_id(slave_id: u8) -> ModbusResult<()> {
        if slave_id == 0 || slave_id > 247 {
            return Err(ModbusError::invalid_param(format!(
                "invalid slave ID: {} (must be 1-247)",
                slave_id
            )));
        }
        Ok(())
    }

    /// Validate that an address range stays within the 16-bit address space
    pub fn validate_address_range(start: u16, count: u16) -> ModbusResult<()> {
        if count == 0 {
            return Err(ModbusError::invalid_quantity(count));
        }
        if (start as u32 + count as u32) > 65536 {
            return Err(ModbusError::invalid_address(start, count));
        }
        Ok(())
    }

    /// Validate a quantity against a per-function-code limit
    pub fn validate_quantity(count: u16, max: u16) -> ModbusResult<()> {
        if count == 0 || count > max {
            return Err(ModbusError::invalid_quantity(count));
        }
        Ok(())
    }
}

/// Formatting and display utilities
pub mod format {
    use std::time::Duration;

    /// Format a byte array as a spaced hex string
    pub fn bytes_to_hex(bytes: &[u8]) -> String {
        bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Format register values as hex words
    pub fn registers_to_hex(registers: &[u16]) -> String {
        registers
            .iter()
            .map(|r| format!("{:04X}", r))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Format a duration in a human-readable way
    pub fn format_duration(duration: Duration) -> String {
        let millis = duration.as_millis();
        if millis < 1000 {
            format!("{}ms", millis)
        } else if millis < 60_000 {
            format!("{:.2}s", duration.as_secs_f64())
        } else {
            let mins = millis / 60_000;
            let secs = (millis % 60_000) as f64 / 1000.0;
            format!("{}m {:.1}s", mins, secs)
        }
    }
}

/// Timer for measuring operation duration
pub struct OperationTimer {
    start: Instant,
    operation_name: String,
}

impl OperationTimer {
    /// Start a new timer
    pub fn start(operation_name: &str) -> Self {
        debug!("starting operation: {}", operation_name);
        Self {
            start: Instant::now(),
            operation_name: operation_name.to_string(),
        }
    }

    /// Stop the timer and return the elapsed duration
    pub fn stop(self) -> Duration {
        let duration = self.start.elapsed();
        debug!(
            "operation '{}' completed in {}",
            self.operation_name,
            format::format_duration(duration)
        );
        duration
    }
}

/// Logging utilities
pub mod logging {
    /// Initialize a simple logger for tests
    pub fn init_test_logger() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }
}
