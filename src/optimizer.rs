//! Request optimization pipeline.
//!
//! Composes address folding, gap-aware merging and FFD packing into a list
//! of request plans. One plan equals one on-wire transaction; the plan list
//! never exceeds the input address count.

use crate::block::{self, Block};
use crate::cost::CostParams;
use crate::error::{ModbusError, ModbusResult};
use crate::master::MasterConfig;
use crate::pack;
use crate::policy::{ModbusFunction, SlaveId};
use crate::utils::validation;
use log::debug;
use serde::{Deserialize, Serialize};

/// A user read intent over possibly non-contiguous addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    /// Slave device ID
    pub slave_id: SlaveId,
    /// Read function code (FC01-04)
    pub function: ModbusFunction,
    /// Addresses to read; order and duplicates do not matter
    pub addresses: Vec<u16>,
}

impl ReadRequest {
    /// Create a new read request.
    pub fn new(slave_id: SlaveId, function: ModbusFunction, addresses: Vec<u16>) -> Self {
        Self {
            slave_id,
            function,
            addresses,
        }
    }

    /// Validate slave ID and function code before optimization.
    pub fn validate(&self) -> ModbusResult<()> {
        validation::validate_slave_id(self.slave_id)?;
        if !self.function.is_read() || !self.function.supports_merge() {
            return Err(ModbusError::invalid_function(self.function.to_u8()));
        }
        Ok(())
    }
}

/// One optimized on-wire transaction.
///
/// Plans are plain values copied into the execution loop; they hold no
/// references into the intermediate block and bin arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPlan {
    /// Slave device ID
    pub slave_id: SlaveId,
    /// Modbus function code
    pub function: ModbusFunction,
    /// Starting address
    pub start_address: u16,
    /// Number of coils/registers
    pub quantity: u16,
}

impl RequestPlan {
    /// Response data bytes this plan will produce.
    pub fn data_size(&self) -> u16 {
        self.function.unit_kind().data_size(self.quantity)
    }
}

/// Run merge and packing over an already folded block list.
///
/// The blocks must share one slave and function code (the folding step
/// guarantees this); cost parameters come from the configuration.
pub fn optimize_blocks(
    mut blocks: Vec<Block>,
    config: &MasterConfig,
) -> ModbusResult<Vec<RequestPlan>> {
    if blocks.is_empty() {
        return Ok(Vec::new());
    }

    let function = blocks[0].function;
    let params = CostParams::new(
        config.mode,
        function,
        config.gap_chars,
        config.latency_chars,
    );

    crate::merge::merge_blocks(&mut blocks, &params)?;

    let bins = pack::ffd_pack(&blocks, config.max_pdu_chars, &params, config.max_plans)?;

    Ok(bins
        .iter()
        .map(|bin| RequestPlan {
            slave_id: bin.slave_id,
            function: bin.function,
            start_address: bin.start_address,
            quantity: bin.quantity,
        })
        .collect())
}

/// Optimize a read request into the minimum set of request plans.
///
/// Empty address lists optimize to zero plans.
pub fn optimize_request(
    request: &ReadRequest,
    config: &MasterConfig,
) -> ModbusResult<Vec<RequestPlan>> {
    request.validate()?;

    let blocks = block::addresses_to_blocks(
        &request.addresses,
        request.slave_id,
        request.function,
        config.max_blocks,
    )?;

    let block_count = blocks.len();
    let plans = optimize_blocks(blocks, config)?;

    debug!(
        "optimized {} addresses -> {} blocks -> {} plans",
        request.addresses.len(),
        block_count,
        plans.len()
    );

    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ModbusMode;

    fn rtu_config() -> MasterConfig {
        MasterConfig::new(ModbusMode::Rtu)
    }

    #[test]
    fn test_optimize_merges_close_blocks() {
        // Gap of 2 registers (cost 4) against overhead 17: one plan
        let request = ReadRequest::new(
            1,
            ModbusFunction::ReadHoldingRegisters,
            vec![100, 101, 102, 105, 106, 107],
        );
        let plans = optimize_request(&request, &rtu_config()).unwrap();

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].start_address, 100);
        assert_eq!(plans[0].quantity, 8);
    }

    #[test]
    fn test_optimize_keeps_expensive_gap_split() {
        // Gap of 12 registers (cost 24) against overhead 17: two plans
        let request = ReadRequest::new(
            1,
            ModbusFunction::ReadHoldingRegisters,
            vec![100, 101, 102, 115, 116, 117],
        );
        let plans = optimize_request(&request, &rtu_config()).unwrap();

        assert_eq!(plans.len(), 2);
        let mut spans: Vec<(u16, u16)> =
            plans.iter().map(|p| (p.start_address, p.quantity)).collect();
        spans.sort_unstable();
        assert_eq!(spans, vec![(100, 3), (115, 3)]);
    }

    #[test]
    fn test_optimize_tcp_threshold_differs() {
        // Same addresses, TCP overhead is 12: a 6-register gap (cost 12)
        // saves nothing and stays split, while 5 (cost 10) merges.
        let config = MasterConfig::new(ModbusMode::Tcp);

        let merged = ReadRequest::new(
            1,
            ModbusFunction::ReadHoldingRegisters,
            vec![100, 101, 107, 108],
        );
        assert_eq!(optimize_request(&merged, &config).unwrap().len(), 1);

        let split = ReadRequest::new(
            1,
            ModbusFunction::ReadHoldingRegisters,
            vec![100, 101, 108, 109],
        );
        assert_eq!(optimize_request(&split, &config).unwrap().len(), 2);
    }

    #[test]
    fn test_optimize_coil_gaps_are_cheap() {
        // A 100-coil gap costs ceil(100/8) = 13 chars, below overhead 17
        let request = ReadRequest::new(
            1,
            ModbusFunction::ReadCoils,
            vec![0, 1, 2, 103, 104],
        );
        let plans = optimize_request(&request, &rtu_config()).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].quantity, 105);
    }

    #[test]
    fn test_optimize_empty() {
        let request = ReadRequest::new(1, ModbusFunction::ReadHoldingRegisters, vec![]);
        let plans = optimize_request(&request, &rtu_config()).unwrap();
        assert!(plans.is_empty());
    }

    #[test]
    fn test_optimize_plan_count_bounded_by_addresses() {
        let addresses: Vec<u16> = (0..20).map(|i| i * 100).collect();
        let request =
            ReadRequest::new(1, ModbusFunction::ReadHoldingRegisters, addresses.clone());
        let plans = optimize_request(&request, &rtu_config()).unwrap();
        assert!(plans.len() <= addresses.len());
    }

    #[test]
    fn test_optimize_rejects_write_function() {
        let request = ReadRequest::new(1, ModbusFunction::WriteSingleRegister, vec![1, 2]);
        assert!(matches!(
            optimize_request(&request, &rtu_config()),
            Err(ModbusError::InvalidFunction { .. })
        ));
    }

    #[test]
    fn test_optimize_rejects_bad_slave() {
        let request = ReadRequest::new(0, ModbusFunction::ReadHoldingRegisters, vec![1]);
        assert!(optimize_request(&request, &rtu_config()).is_err());
    }

    #[test]
    fn test_optimize_plan_limits() {
        let mut config = rtu_config();
        config.max_plans = 2;
        let addresses: Vec<u16> = (0..5).map(|i| i * 1000).collect();
        let request = ReadRequest::new(1, ModbusFunction::ReadHoldingRegisters, addresses);
        assert!(matches!(
            optimize_request(&request, &config),
            Err(ModbusError::TooManyPlans { .. })
        ));
    }

    #[test]
    fn test_optimize_block_limits() {
        let mut config = rtu_config();
        config.max_blocks = 3;
        let addresses: Vec<u16> = (0..5).map(|i| i * 1000).collect();
        let request = ReadRequest::new(1, ModbusFunction::ReadHoldingRegisters, addresses);
        assert!(matches!(
            optimize_request(&request, &config),
            Err(ModbusError::TooManyBlocks { .. })
        ));
    }

    #[test]
    fn test_plan_data_size() {
        let plan = RequestPlan {
            slave_id: 1,
            function: ModbusFunction::ReadCoils,
            start_address: 0,
            quantity: 20,
        };
        assert_eq!(plan.data_size(), 3);
    }
}
