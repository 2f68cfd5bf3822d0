//! Address blocks and the address-list folding step.
//!
//! A [`Block`] is a contiguous address range for one slave and function code.
//! [`addresses_to_blocks`] turns an unordered, possibly duplicated address
//! list into the sorted maximal-run decomposition that the merge and packing
//! stages consume.

use crate::error::{ModbusError, ModbusResult};
use crate::policy::ModbusFunction;
use crate::utils::validation;

/// A contiguous address range for a single slave and function code.
///
/// Invariants: `start_address + quantity <= 65536` and
/// `quantity <= max_quantity(function)`. Blocks are plain values; merging
/// produces a new block rather than mutating the inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Slave device ID (1-247)
    pub slave_id: u8,
    /// Modbus function code
    pub function: ModbusFunction,
    /// Starting address
    pub start_address: u16,
    /// Number of coils/registers
    pub quantity: u16,
    /// Set when the block was created by merging two blocks
    pub is_merged: bool,
}

impl Block {
    /// Create a new unmerged block.
    pub fn new(slave_id: u8, function: ModbusFunction, start_address: u16, quantity: u16) -> Self {
        Self {
            slave_id,
            function,
            start_address,
            quantity,
            is_merged: false,
        }
    }

    /// One past the last address covered by this block.
    ///
    /// Returned as `u32` because a block ending at 65536 is legal.
    pub fn end_address(&self) -> u32 {
        self.start_address as u32 + self.quantity as u32
    }

    /// Validate slave ID, function code, quantity and address range.
    pub fn validate(&self) -> ModbusResult<()> {
        validation::validate_slave_id(self.slave_id)?;

        if self.quantity == 0 {
            return Err(ModbusError::invalid_quantity(self.quantity));
        }
        if self.quantity > self.function.max_quantity() {
            return Err(ModbusError::invalid_quantity(self.quantity));
        }
        if self.end_address() > 0x10000 {
            return Err(ModbusError::invalid_address(
                self.start_address,
                self.quantity,
            ));
        }
        Ok(())
    }

    /// Whether two blocks may ever be combined: same slave, same function.
    pub fn is_compatible(&self, other: &Block) -> bool {
        self.slave_id == other.slave_id && self.function == other.function
    }

    /// Whether `other` starts exactly where this block ends.
    pub fn is_adjacent(&self, other: &Block) -> bool {
        self.is_compatible(other) && self.end_address() == other.start_address as u32
    }

    /// Unrequested units between two non-overlapping blocks, in either order.
    ///
    /// Overlapping or adjacent blocks have a gap of zero.
    pub fn gap_to(&self, other: &Block) -> u16 {
        let (earlier, later) = if self.start_address <= other.start_address {
            (self, other)
        } else {
            (other, self)
        };
        let end = earlier.end_address();
        if end >= later.start_address as u32 {
            0
        } else {
            (later.start_address as u32 - end) as u16
        }
    }

    /// Merge two compatible blocks into one spanning both ranges.
    ///
    /// The result covers `[min(start), max(end))` and is flagged merged.
    pub fn merge_with(&self, other: &Block) -> ModbusResult<Block> {
        if !self.is_compatible(other) {
            return Err(ModbusError::invalid_param(
                "cannot merge blocks with different slave or function code",
            ));
        }

        let start = self.start_address.min(other.start_address);
        let end = self.end_address().max(other.end_address());

        Ok(Block {
            slave_id: self.slave_id,
            function: self.function,
            start_address: start,
            quantity: (end - start as u32) as u16,
            is_merged: true,
        })
    }

    /// Response data bytes this block occupies.
    pub fn data_size(&self) -> u16 {
        self.function.unit_kind().data_size(self.quantity)
    }
}

/// Sort blocks by starting address, ascending.
pub fn sort_by_address(blocks: &mut [Block]) {
    blocks.sort_by_key(|b| b.start_address);
}

/// Sort blocks by quantity, descending, for FFD packing.
pub fn sort_by_quantity_desc(blocks: &mut [Block]) {
    blocks.sort_by(|a, b| b.quantity.cmp(&a.quantity));
}

/// Fold an unordered address list into sorted maximal-run blocks.
///
/// Duplicate addresses collapse. An empty list is a successful empty
/// decomposition. Runs longer than the function's maximum quantity split so
/// that every produced block satisfies the block invariants. Producing more
/// than `max_blocks` blocks fails with `TooManyBlocks`.
pub fn addresses_to_blocks(
    addresses: &[u16],
    slave_id: u8,
    function: ModbusFunction,
    max_blocks: usize,
) -> ModbusResult<Vec<Block>> {
    if addresses.is_empty() {
        return Ok(Vec::new());
    }

    let max_quantity = function.max_quantity();
    let mut sorted = addresses.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut blocks = Vec::new();
    let mut run_start = sorted[0];
    let mut run_len: u16 = 1;

    for &addr in &sorted[1..] {
        if addr as u32 == run_start as u32 + run_len as u32 && run_len < max_quantity {
            run_len += 1;
        } else {
            if blocks.len() >= max_blocks {
                return Err(ModbusError::TooManyBlocks {
                    count: blocks.len() + 1,
                    max: max_blocks,
                });
            }
            blocks.push(Block::new(slave_id, function, run_start, run_len));
            run_start = addr;
            run_len = 1;
        }
    }

    if blocks.len() >= max_blocks {
        return Err(ModbusError::TooManyBlocks {
            count: blocks.len() + 1,
            max: max_blocks,
        });
    }
    blocks.push(Block::new(slave_id, function, run_start, run_len));

    Ok(blocks)
}
