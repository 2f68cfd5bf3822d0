//! First-Fit Decreasing packing of merged blocks into PDU-sized bins.
//!
//! Blocks are taken largest-first and dropped into the first bin that can
//! absorb them. A bin accepts a block when slave and function code match,
//! the combined span stays within the function's quantity limit and the PDU
//! byte budget, and combining does not re-introduce a gap the cost model
//! prices above one round-trip. Each resulting bin becomes exactly one
//! on-wire transaction.

use crate::block::{self, Block};
use crate::cost::{self, CostParams};
use crate::error::{ModbusError, ModbusResult};
use crate::policy::ModbusFunction;

/// An in-progress pack target covering one contiguous address span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduBin {
    /// Slave device ID
    pub slave_id: u8,
    /// Modbus function code
    pub function: ModbusFunction,
    /// Starting address of the combined span
    pub start_address: u16,
    /// Total quantity across the combined span
    pub quantity: u16,
    /// Response data bytes for the combined span
    pub data_chars: u16,
}

impl PduBin {
    /// Open a new bin holding exactly one block.
    pub fn from_block(block: &Block) -> Self {
        Self {
            slave_id: block.slave_id,
            function: block.function,
            start_address: block.start_address,
            quantity: block.quantity,
            data_chars: block.data_size(),
        }
    }

    /// One past the last address covered by this bin.
    pub fn end_address(&self) -> u32 {
        self.start_address as u32 + self.quantity as u32
    }

    /// Span the bin would cover after absorbing `block`: `[min(start), max(end))`.
    fn combined_span(&self, block: &Block) -> (u16, u16) {
        let start = self.start_address.min(block.start_address);
        let end = self.end_address().max(block.end_address());
        (start, (end - start as u32) as u16)
    }

    /// Gap the bin would swallow by absorbing `block`, zero when the ranges
    /// touch or overlap.
    fn gap_to(&self, block: &Block) -> u16 {
        if block.start_address as u32 >= self.end_address() {
            (block.start_address as u32 - self.end_address()) as u16
        } else if self.start_address as u32 >= block.end_address() {
            (self.start_address as u32 - block.end_address()) as u16
        } else {
            0
        }
    }

    /// Whether this bin can absorb `block` under the given limits.
    pub fn accepts(&self, block: &Block, max_pdu_chars: u16, params: &CostParams) -> bool {
        if block.slave_id != self.slave_id || block.function != self.function {
            return false;
        }

        let (_, combined_qty) = self.combined_span(block);
        if combined_qty > self.function.max_quantity() {
            return false;
        }
        if self.function.unit_kind().data_size(combined_qty) > max_pdu_chars {
            return false;
        }

        // Combining separated ranges reads the units in between; only worth
        // it when that costs less than the round-trip this bin saves.
        let gap = self.gap_to(block);
        gap == 0 || cost::merge_savings(gap, self.function, params) > 0
    }

    /// Absorb a block, growing the span to cover both ranges.
    pub fn absorb(&mut self, block: &Block) {
        let (start, quantity) = self.combined_span(block);
        self.start_address = start;
        self.quantity = quantity;
        self.data_chars = self.function.unit_kind().data_size(quantity);
    }

    /// Fill ratio of this bin against the PDU byte budget, in percent.
    pub fn utilization(&self, max_pdu_chars: u16) -> f32 {
        if max_pdu_chars == 0 {
            return 0.0;
        }
        self.data_chars as f32 / max_pdu_chars as f32 * 100.0
    }
}

/// Pack blocks into PDU bins, first-fit over a descending-by-quantity order.
///
/// Every block is guaranteed to place: a fresh bin always fits a block that
/// itself satisfies the per-function limits. Producing more than `max_bins`
/// bins fails with `TooManyPlans`.
pub fn ffd_pack(
    blocks: &[Block],
    max_pdu_chars: u16,
    params: &CostParams,
    max_bins: usize,
) -> ModbusResult<Vec<PduBin>> {
    if blocks.is_empty() {
        return Ok(Vec::new());
    }

    let mut sorted = blocks.to_vec();
    block::sort_by_quantity_desc(&mut sorted);

    let mut bins: Vec<PduBin> = Vec::new();

    for blk in &sorted {
        if let Some(bin) = bins
            .iter_mut()
            .find(|bin| bin.accepts(blk, max_pdu_chars, params))
        {
            bin.absorb(blk);
        } else {
            if bins.len() >= max_bins {
                return Err(ModbusError::TooManyPlans {
                    count: bins.len() + 1,
                    max: max_bins,
                });
            }
            bins.push(PduBin::from_block(blk));
        }
    }

    Ok(bins)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rtu_params() -> CostParams {
        CostParams {
            req_fixed_chars: 6,
            resp_fixed_chars: 5,
            gap_chars: 4,
            latency_chars: 2,
        }
    }

    fn reg_block(start: u16, qty: u16) -> Block {
        Block::new(1, ModbusFunction::ReadHoldingRegisters, start, qty)
    }

    #[test]
    fn test_pack_single_block() {
        let blocks = [reg_block(100, 10)];
        let bins = ffd_pack(&blocks, 253, &rtu_params(), 16).unwrap();

        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].slave_id, 1);
        assert_eq!(bins[0].start_address, 100);
        assert_eq!(bins[0].quantity, 10);
        assert_eq!(bins[0].data_chars, 20);
    }

    #[test]
    fn test_pack_adjacent_blocks_combine() {
        let blocks = [reg_block(100, 10), reg_block(110, 10)];
        let bins = ffd_pack(&blocks, 253, &rtu_params(), 16).unwrap();

        assert_eq!(bins.len(), 1);
        assert_eq!((bins[0].start_address, bins[0].quantity), (100, 20));
    }

    #[test]
    fn test_pack_rejected_gap_stays_split() {
        // Post-merge survivors: a 12-register gap prices at 24 chars,
        // above the 17-char overhead, so the bins must not recombine them.
        let blocks = [reg_block(100, 3), reg_block(115, 3)];
        let bins = ffd_pack(&blocks, 253, &rtu_params(), 16).unwrap();

        assert_eq!(bins.len(), 2);
        // FFD keeps descending order; equal quantities keep their sorted order
        let mut starts: Vec<u16> = bins.iter().map(|b| b.start_address).collect();
        starts.sort_unstable();
        assert_eq!(starts, vec![100, 115]);
    }

    #[test]
    fn test_pack_cheap_gap_combines() {
        // A 2-register gap costs 4 chars, below the 17-char overhead
        let blocks = [reg_block(100, 3), reg_block(105, 3)];
        let bins = ffd_pack(&blocks, 253, &rtu_params(), 16).unwrap();

        assert_eq!(bins.len(), 1);
        assert_eq!((bins[0].start_address, bins[0].quantity), (100, 8));
    }

    #[test]
    fn test_pack_different_slaves_separate() {
        let mut b2 = reg_block(100, 10);
        b2.slave_id = 2;
        let blocks = [reg_block(100, 10), b2];
        let bins = ffd_pack(&blocks, 253, &rtu_params(), 16).unwrap();
        assert_eq!(bins.len(), 2);
    }

    #[test]
    fn test_pack_different_functions_separate() {
        let blocks = [
            reg_block(100, 10),
            Block::new(1, ModbusFunction::ReadInputRegisters, 110, 10),
        ];
        let bins = ffd_pack(&blocks, 253, &rtu_params(), 16).unwrap();
        assert_eq!(bins.len(), 2);
    }

    #[test]
    fn test_pack_quantity_limit() {
        // Two full-size reads cannot share a bin: combined span exceeds 125
        let blocks = [reg_block(100, 125), reg_block(300, 125)];
        let bins = ffd_pack(&blocks, 253, &rtu_params(), 16).unwrap();
        assert_eq!(bins.len(), 2);
    }

    #[test]
    fn test_pack_pdu_byte_limit() {
        // Adjacent 60+60 registers span 120 (within max quantity) but need
        // 240 data bytes; a 100-char budget forces separate bins.
        let blocks = [reg_block(0, 60), reg_block(60, 60)];
        let bins = ffd_pack(&blocks, 100, &rtu_params(), 16).unwrap();
        assert_eq!(bins.len(), 2);

        let bins = ffd_pack(&blocks, 253, &rtu_params(), 16).unwrap();
        assert_eq!(bins.len(), 1);
    }

    #[test]
    fn test_pack_descending_order_drives_placement() {
        // The large block opens the first bin, the small ones join it
        let blocks = [reg_block(10, 2), reg_block(0, 10), reg_block(12, 2)];
        let bins = ffd_pack(&blocks, 253, &rtu_params(), 16).unwrap();
        assert_eq!(bins.len(), 1);
        assert_eq!((bins[0].start_address, bins[0].quantity), (0, 14));
    }

    #[test]
    fn test_pack_bin_limits_hold() {
        let blocks: Vec<Block> = (0..10).map(|i| reg_block(i * 30, 20)).collect();
        let bins = ffd_pack(&blocks, 253, &rtu_params(), 32).unwrap();
        for bin in &bins {
            assert!(bin.quantity <= bin.function.max_quantity());
            assert!(bin.data_chars <= 253);
        }
    }

    #[test]
    fn test_pack_max_bins() {
        let mut b2 = reg_block(100, 10);
        b2.slave_id = 2;
        let blocks = [reg_block(100, 10), b2];
        let result = ffd_pack(&blocks, 253, &rtu_params(), 1);
        assert!(matches!(result, Err(ModbusError::TooManyPlans { max: 1, .. })));
    }

    #[test]
    fn test_pack_empty() {
        let bins = ffd_pack(&[], 253, &rtu_params(), 16).unwrap();
        assert!(bins.is_empty());
    }

    #[test]
    fn test_utilization() {
        let bin = PduBin::from_block(&reg_block(0, 100));
        assert!((bin.utilization(253) - 200.0 / 253.0 * 100.0).abs() < 0.01);
        assert_eq!(bin.utilization(0), 0.0);
    }

    #[test]
    fn test_pack_bit_blocks() {
        let blocks = [
            Block::new(1, ModbusFunction::ReadCoils, 0, 16),
            Block::new(1, ModbusFunction::ReadCoils, 16, 16),
        ];
        let bins = ffd_pack(&blocks, 253, &rtu_params(), 16).unwrap();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].quantity, 32);
        assert_eq!(bins[0].data_chars, 4);
    }
}
