//! Gap-aware greedy merge.
//!
//! Walks a sorted block array keeping a moving "current" block. Each next
//! block either gets absorbed (adjacent, or its gap prices below one
//! round-trip overhead) or the current block is emitted and the walk
//! continues from the next one. Output preserves sort order, never overlaps,
//! and every output span is a union of contiguous-by-index input spans.

use crate::block::{self, Block};
use crate::cost::{self, CostParams};
use crate::error::ModbusResult;
use crate::frame::ModbusMode;
use log::debug;

/// Decide whether two blocks should become one request.
///
/// Requires compatibility (same slave and function) and a function code with
/// merge support. Adjacent blocks always merge; separated blocks merge only
/// when the gap cost is strictly below the round-trip overhead.
pub fn should_merge(a: &Block, b: &Block, params: &CostParams) -> bool {
    if !a.is_compatible(b) {
        return false;
    }
    if !a.function.supports_merge() {
        return false;
    }

    // The merged span must stay a legal single request
    let start = a.start_address.min(b.start_address);
    let end = a.end_address().max(b.end_address());
    if end - start as u32 > a.function.max_quantity() as u32 {
        return false;
    }

    let gap_units = a.gap_to(b);
    if gap_units == 0 {
        // Adjacent or overlapping: nothing unwanted to read
        return true;
    }

    cost::merge_savings(gap_units, a.function, params) > 0
}

/// Merge a block vec in place.
///
/// Sorts by address first, then performs the greedy pass. The vec is
/// truncated to the merged count on return.
pub fn merge_blocks(blocks: &mut Vec<Block>, params: &CostParams) -> ModbusResult<()> {
    if blocks.is_empty() {
        return Ok(());
    }

    block::sort_by_address(blocks);

    let mut write_idx = 0;
    let mut read_idx = 0;

    while read_idx < blocks.len() {
        let mut current = blocks[read_idx];
        read_idx += 1;

        while read_idx < blocks.len() {
            let next = blocks[read_idx];
            if should_merge(&current, &next, params) {
                current = current.merge_with(&next)?;
                read_idx += 1;
            } else {
                break;
            }
        }

        blocks[write_idx] = current;
        write_idx += 1;
    }

    blocks.truncate(write_idx);
    Ok(())
}

/// Convenience wrapper: merge with per-mode default cost parameters, taking
/// the function code from the first block.
///
/// Returns the number of merges performed.
pub fn merge_blocks_greedy(
    blocks: &mut Vec<Block>,
    mode: ModbusMode,
    latency_chars: u8,
) -> ModbusResult<usize> {
    if blocks.is_empty() {
        return Ok(0);
    }

    let original_count = blocks.len();
    let params = CostParams::for_mode(mode, blocks[0].function, latency_chars);

    merge_blocks(blocks, &params)?;

    let merges = original_count - blocks.len();
    if merges > 0 {
        debug!(
            "merged {} blocks into {} ({} round-trips saved)",
            original_count,
            blocks.len(),
            merges
        );
    }
    Ok(merges)
}
