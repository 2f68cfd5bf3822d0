//! Character-based cost model.
//!
//! Every quantity here is a "character": one byte of addressing, PDU or
//! checksum counts as one character regardless of protocol variant, so merge
//! decisions stay independent of baudrate, wire encoding and timing. ASCII
//! hex-doubles bytes on the wire but the model deliberately prices it the
//! same; it is a decision tool, not a wire-length predictor.
//!
//! The merge rule: a gap between two blocks is worth absorbing exactly when
//! reading the unwanted units costs fewer characters than a second
//! round-trip's fixed overhead.

use crate::block::Block;
use crate::frame::ModbusMode;
use crate::policy::{ModbusFunction, UnitKind};
use serde::{Deserialize, Serialize};

/// Default inter-frame gap for RTU/ASCII, the 3.5-character silence rounded up
pub const DEFAULT_SERIAL_GAP_CHARS: u8 = 4;

/// Default latency allowance for serial modes
pub const DEFAULT_SERIAL_LATENCY_CHARS: u8 = 2;

/// Default latency allowance for TCP
pub const DEFAULT_TCP_LATENCY_CHARS: u8 = 1;

/// Cost calculation parameters for one optimization run
///
/// Derived from the protocol mode, the function code policy and the caller's
/// latency setting; immutable for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostParams {
    /// Request fixed overhead (chars)
    pub req_fixed_chars: u8,
    /// Response fixed overhead (chars)
    pub resp_fixed_chars: u8,
    /// Inter-frame gap (RTU/ASCII: 4, TCP: 0)
    pub gap_chars: u8,
    /// Network/processing latency equivalent (chars)
    pub latency_chars: u8,
}

impl CostParams {
    /// Build cost parameters from explicit gap and latency settings.
    ///
    /// The gap is zeroed for TCP regardless of the passed value; TCP streams
    /// have no inter-frame silence.
    pub fn new(mode: ModbusMode, function: ModbusFunction, gap_chars: u8, latency_chars: u8) -> Self {
        let policy = function.policy();
        Self {
            req_fixed_chars: policy.req_fixed_chars,
            resp_fixed_chars: policy.resp_fixed_chars,
            gap_chars: if mode.is_serial() { gap_chars } else { 0 },
            latency_chars,
        }
    }

    /// Build cost parameters with the per-mode default gap.
    pub fn for_mode(mode: ModbusMode, function: ModbusFunction, latency_chars: u8) -> Self {
        let gap = if mode.is_serial() {
            DEFAULT_SERIAL_GAP_CHARS
        } else {
            0
        };
        Self::new(mode, function, gap, latency_chars)
    }

    /// Fixed character cost of one complete round-trip.
    pub fn overhead_chars(&self) -> u16 {
        self.req_fixed_chars as u16
            + self.resp_fixed_chars as u16
            + self.gap_chars as u16
            + self.latency_chars as u16
    }
}

/// Fixed round-trip overhead for a function code under the given mode.
///
/// `overhead = req_fixed + resp_fixed + (serial ? gap : 0) + latency`.
pub fn overhead_chars(
    mode: ModbusMode,
    function: ModbusFunction,
    gap_chars: u8,
    latency_chars: u8,
) -> u16 {
    CostParams::new(mode, function, gap_chars, latency_chars).overhead_chars()
}

/// Character cost of reading `gap_units` unwanted units.
///
/// Register kinds cost two characters per unit; bit kinds cost the
/// conservative byte count `ceil(gap / 8)`. This formula is normative; the
/// scaled `extra_unit_chars` in the policy table is advisory threshold
/// arithmetic for callers that do not recompute it.
pub fn gap_cost(function: ModbusFunction, gap_units: u16) -> u16 {
    if gap_units == 0 {
        return 0;
    }
    match function.unit_kind() {
        UnitKind::Bit => gap_units.div_ceil(8),
        UnitKind::Register => gap_units * 2,
    }
}

/// Characters saved by merging across a gap instead of paying another
/// round-trip.
///
/// Positive means merging is cheaper; zero or negative means it is not.
/// No tie-breaking adjustments: a zero-savings merge is rejected.
pub fn merge_savings(gap_units: u16, function: ModbusFunction, params: &CostParams) -> i32 {
    params.overhead_chars() as i32 - gap_cost(function, gap_units) as i32
}

/// Total character cost of issuing one block as a single request:
/// round-trip overhead plus the block's payload bytes.
pub fn request_cost(block: &Block, mode: ModbusMode, gap_chars: u8, latency_chars: u8) -> u16 {
    let overhead = overhead_chars(mode, block.function, gap_chars, latency_chars);
    overhead + block.data_size()
}
