//! Modbus function codes and the per-function policy table.
//!
//! The policy table is the process-lifetime constant that drives every merge
//! and packing decision: whether a function code may absorb gaps, its fixed
//! request/response overhead in characters, the per-unit data cost used to
//! price a gap, and the maximum quantity a single request may carry.

use crate::error::{ModbusError, ModbusResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Modbus slave/unit identifier (1-247)
pub type SlaveId = u8;

/// Modbus function codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ModbusFunction {
    /// Read Coils (0x01)
    ReadCoils = 0x01,
    /// Read Discrete Inputs (0x02)
    ReadDiscreteInputs = 0x02,
    /// Read Holding Registers (0x03)
    ReadHoldingRegisters = 0x03,
    /// Read Input Registers (0x04)
    ReadInputRegisters = 0x04,
    /// Write Single Coil (0x05)
    WriteSingleCoil = 0x05,
    /// Write Single Register (0x06)
    WriteSingleRegister = 0x06,
    /// Write Multiple Coils (0x0F)
    WriteMultipleCoils = 0x0F,
    /// Write Multiple Registers (0x10)
    WriteMultipleRegisters = 0x10,
    /// Mask Write Register (0x16)
    MaskWriteRegister = 0x16,
    /// Read/Write Multiple Registers (0x17)
    ReadWriteMultipleRegisters = 0x17,
}

impl ModbusFunction {
    /// Convert from u8 to ModbusFunction
    pub fn from_u8(value: u8) -> ModbusResult<Self> {
        match value {
            0x01 => Ok(ModbusFunction::ReadCoils),
            0x02 => Ok(ModbusFunction::ReadDiscreteInputs),
            0x03 => Ok(ModbusFunction::ReadHoldingRegisters),
            0x04 => Ok(ModbusFunction::ReadInputRegisters),
            0x05 => Ok(ModbusFunction::WriteSingleCoil),
            0x06 => Ok(ModbusFunction::WriteSingleRegister),
            0x0F => Ok(ModbusFunction::WriteMultipleCoils),
            0x10 => Ok(ModbusFunction::WriteMultipleRegisters),
            0x16 => Ok(ModbusFunction::MaskWriteRegister),
            0x17 => Ok(ModbusFunction::ReadWriteMultipleRegisters),
            _ => Err(ModbusError::invalid_function(value)),
        }
    }

    /// Convert to u8
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Check if this is a read function
    pub fn is_read(self) -> bool {
        self.policy().is_read
    }

    /// Check if this is a write function
    pub fn is_write(self) -> bool {
        !self.policy().is_read
    }

    /// Check if this function code may merge non-contiguous blocks
    pub fn supports_merge(self) -> bool {
        self.policy().supports_merge
    }

    /// Addressable unit kind (bit or 16-bit register)
    pub fn unit_kind(self) -> UnitKind {
        self.policy().unit_kind
    }

    /// Maximum quantity a single request may carry
    pub fn max_quantity(self) -> u16 {
        self.policy().max_quantity
    }

    /// Look up the policy entry for this function code
    pub fn policy(self) -> &'static FcPolicy {
        // The table covers every enum variant; the scan cannot fail.
        FC_POLICY_TABLE
            .iter()
            .find(|p| p.function == self)
            .expect("policy table covers all function codes")
    }
}

impl fmt::Display for ModbusFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModbusFunction::ReadCoils => "Read Coils",
            ModbusFunction::ReadDiscreteInputs => "Read Discrete Inputs",
            ModbusFunction::ReadHoldingRegisters => "Read Holding Registers",
            ModbusFunction::ReadInputRegisters => "Read Input Registers",
            ModbusFunction::WriteSingleCoil => "Write Single Coil",
            ModbusFunction::WriteSingleRegister => "Write Single Register",
            ModbusFunction::WriteMultipleCoils => "Write Multiple Coils",
            ModbusFunction::WriteMultipleRegisters => "Write Multiple Registers",
            ModbusFunction::MaskWriteRegister => "Mask Write Register",
            ModbusFunction::ReadWriteMultipleRegisters => "Read/Write Multiple Registers",
        };
        write!(f, "{} (0x{:02X})", name, *self as u8)
    }
}

/// Addressable unit kind of a function code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitKind {
    /// Coils and discrete inputs: one bit per unit, packed eight to a byte
    Bit,
    /// Registers: one 16-bit word per unit
    Register,
}

impl UnitKind {
    /// Data bytes needed to carry `quantity` units of this kind.
    ///
    /// Bits pack eight per byte rounded up; registers take two bytes each.
    pub fn data_size(self, quantity: u16) -> u16 {
        match self {
            UnitKind::Bit => quantity.div_ceil(8),
            UnitKind::Register => quantity * 2,
        }
    }
}

/// Per-function-code policy entry
///
/// Fixed character overheads count every byte of addressing, framing and
/// checksum once, independent of wire encoding. `extra_unit_chars` is scaled
/// by 100 so the bit kinds keep sub-byte precision (12 represents 0.12); the
/// merge decision itself uses the exact formulas in [`crate::cost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FcPolicy {
    /// Function code this entry describes
    pub function: ModbusFunction,
    /// Whether non-contiguous blocks may merge under this code
    pub supports_merge: bool,
    /// Read vs write operation
    pub is_read: bool,
    /// Fixed request overhead in characters
    pub req_fixed_chars: u8,
    /// Fixed response overhead in characters
    pub resp_fixed_chars: u8,
    /// Per-unit data cost, scaled by 100 for precision
    pub extra_unit_chars: u16,
    /// Maximum quantity per request
    pub max_quantity: u16,
    /// Addressable unit kind
    pub unit_kind: UnitKind,
}

/// The function code policy table.
///
/// Request overhead for the read codes is Addr(1) + FC(1) + StartAddr(2) +
/// Quantity(2); response overhead is Addr(1) + FC(1) + ByteCount(1) + CRC(2).
/// The multiple-write codes carry one extra byte-count character in the
/// request.
static FC_POLICY_TABLE: &[FcPolicy] = &[
    FcPolicy {
        function: ModbusFunction::ReadCoils,
        supports_merge: true,
        is_read: true,
        req_fixed_chars: 6,
        resp_fixed_chars: 5,
        extra_unit_chars: 12,
        max_quantity: 2000,
        unit_kind: UnitKind::Bit,
    },
    FcPolicy {
        function: ModbusFunction::ReadDiscreteInputs,
        supports_merge: true,
        is_read: true,
        req_fixed_chars: 6,
        resp_fixed_chars: 5,
        extra_unit_chars: 12,
        max_quantity: 2000,
        unit_kind: UnitKind::Bit,
    },
    FcPolicy {
        function: ModbusFunction::ReadHoldingRegisters,
        supports_merge: true,
        is_read: true,
        req_fixed_chars: 6,
        resp_fixed_chars: 5,
        extra_unit_chars: 200,
        max_quantity: 125,
        unit_kind: UnitKind::Register,
    },
    FcPolicy {
        function: ModbusFunction::ReadInputRegisters,
        supports_merge: true,
        is_read: true,
        req_fixed_chars: 6,
        resp_fixed_chars: 5,
        extra_unit_chars: 200,
        max_quantity: 125,
        unit_kind: UnitKind::Register,
    },
    FcPolicy {
        function: ModbusFunction::WriteSingleCoil,
        supports_merge: false,
        is_read: false,
        req_fixed_chars: 6,
        resp_fixed_chars: 6,
        extra_unit_chars: 0,
        max_quantity: 1,
        unit_kind: UnitKind::Register,
    },
    FcPolicy {
        function: ModbusFunction::WriteSingleRegister,
        supports_merge: false,
        is_read: false,
        req_fixed_chars: 6,
        resp_fixed_chars: 6,
        extra_unit_chars: 0,
        max_quantity: 1,
        unit_kind: UnitKind::Register,
    },
    FcPolicy {
        function: ModbusFunction::WriteMultipleCoils,
        supports_merge: false,
        is_read: false,
        req_fixed_chars: 7,
        resp_fixed_chars: 6,
        extra_unit_chars: 0,
        max_quantity: 1968,
        unit_kind: UnitKind::Bit,
    },
    FcPolicy {
        function: ModbusFunction::WriteMultipleRegisters,
        supports_merge: false,
        is_read: false,
        req_fixed_chars: 7,
        resp_fixed_chars: 6,
        extra_unit_chars: 0,
        max_quantity: 123,
        unit_kind: UnitKind::Register,
    },
    FcPolicy {
        function: ModbusFunction::MaskWriteRegister,
        supports_merge: false,
        is_read: false,
        req_fixed_chars: 8,
        resp_fixed_chars: 8,
        extra_unit_chars: 0,
        max_quantity: 1,
        unit_kind: UnitKind::Register,
    },
    FcPolicy {
        function: ModbusFunction::ReadWriteMultipleRegisters,
        supports_merge: false,
        is_read: true,
        req_fixed_chars: 11,
        resp_fixed_chars: 5,
        extra_unit_chars: 0,
        max_quantity: 121,
        unit_kind: UnitKind::Register,
    },
];

impl FcPolicy {
    /// Look up the policy for a raw function code byte.
    ///
    /// Returns `InvalidFunction` for codes outside the table.
    pub fn lookup(code: u8) -> ModbusResult<&'static FcPolicy> {
        Ok(ModbusFunction::from_u8(code)?.policy())
    }
}
