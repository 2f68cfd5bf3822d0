//! Master orchestration.
//!
//! [`ModbusMaster`] drives the full pipeline for each operation: build the
//! request PDU, encode the frame for the configured mode, run the transport
//! round-trip, decode and validate the response, parse the payload and
//! update statistics. Optimized reads first run the request optimizer and
//! then execute the resulting plans strictly in order, aborting on the first
//! failure.
//!
//! A master context is single-threaded: one operation at a time, one frame
//! in flight. The only suspension points are the transport's `send`, `recv`
//! and `delay_chars` calls.

use crate::block;
use crate::cost::{
    DEFAULT_SERIAL_GAP_CHARS, DEFAULT_SERIAL_LATENCY_CHARS, DEFAULT_TCP_LATENCY_CHARS,
};
use crate::error::{ModbusError, ModbusResult};
use crate::frame::{self, DecodedFrame, ModbusMode};
use crate::logging::CallbackLogger;
use crate::optimizer::{self, ReadRequest, RequestPlan};
use crate::policy::{ModbusFunction, SlaveId};
use crate::response::{self, ResponseData};
use crate::transport::MasterTransport;
use crate::utils::{validation, OperationTimer};
use serde::{Deserialize, Serialize};

/// Default capacity for intermediate block lists
pub const DEFAULT_MAX_BLOCKS: usize = 64;

/// Default capacity for request plan lists
pub const DEFAULT_MAX_PLANS: usize = 16;

/// Master configuration
///
/// Plain values only; the transport handle is passed to the master
/// separately. `timeout_ms` documents the response deadline, which the
/// transport enforces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Protocol mode (RTU/ASCII/TCP)
    pub mode: ModbusMode,
    /// Maximum PDU data size in characters (default 253)
    pub max_pdu_chars: u16,
    /// Inter-frame gap in characters (RTU/ASCII: 4, TCP: 0)
    pub gap_chars: u8,
    /// Network/processing latency equivalent in characters
    pub latency_chars: u8,
    /// Response timeout in milliseconds, enforced by the transport
    pub timeout_ms: u64,
    /// Capacity for intermediate block lists
    pub max_blocks: usize,
    /// Capacity for request plan lists
    pub max_plans: usize,
}

impl MasterConfig {
    /// Default configuration for the given protocol mode.
    pub fn new(mode: ModbusMode) -> Self {
        let (gap_chars, latency_chars) = if mode.is_serial() {
            (DEFAULT_SERIAL_GAP_CHARS, DEFAULT_SERIAL_LATENCY_CHARS)
        } else {
            (0, DEFAULT_TCP_LATENCY_CHARS)
        };
        Self {
            mode,
            max_pdu_chars: crate::MAX_PDU_CHARS as u16,
            gap_chars,
            latency_chars,
            timeout_ms: 1000,
            max_blocks: DEFAULT_MAX_BLOCKS,
            max_plans: DEFAULT_MAX_PLANS,
        }
    }
}

/// Master statistics
///
/// Updated only by the master; readable at any time between operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterStats {
    /// Round-trips attempted
    pub total_requests: u64,
    /// Responses successfully decoded and validated
    pub total_responses: u64,
    /// Optimized read operations processed
    pub optimized_requests: u64,
    /// Round-trips saved by merging and packing
    pub rounds_saved: u64,
    /// Blocks merged away by optimization
    pub blocks_merged: u64,
    /// Frame bytes sent
    pub bytes_sent: u64,
    /// Frame bytes received
    pub bytes_received: u64,
}

/// Result of an optimized read
///
/// Carries the executed plans and the merged response data concatenated in
/// plan order. Because merging may have pulled in addresses the caller never
/// asked for, the per-address accessors resolve an original address into the
/// merged buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedRead {
    /// Plans executed, in execution order
    pub plans: Vec<RequestPlan>,
    /// Merged response data, concatenated in plan order
    pub data: ResponseData,
}

impl OptimizedRead {
    /// Register value at an absolute address, for register-kind reads.
    pub fn register_at(&self, address: u16) -> Option<u16> {
        let registers = self.data.registers()?;
        let mut offset = 0usize;
        for plan in &self.plans {
            let start = plan.start_address as u32;
            if (address as u32) >= start && (address as u32) < start + plan.quantity as u32 {
                return registers
                    .get(offset + (address - plan.start_address) as usize)
                    .copied();
            }
            offset += plan.quantity as usize;
        }
        None
    }

    /// Coil/discrete-input state at an absolute address, for bit-kind reads.
    ///
    /// Each plan's bytes are byte-aligned in the merged buffer; bits are
    /// LSB-first within each byte.
    pub fn coil_at(&self, address: u16) -> Option<bool> {
        let bytes = self.data.bits()?;
        let mut byte_offset = 0usize;
        for plan in &self.plans {
            let start = plan.start_address as u32;
            if (address as u32) >= start && (address as u32) < start + plan.quantity as u32 {
                let bit_index = (address - plan.start_address) as usize;
                let byte = bytes.get(byte_offset + bit_index / 8)?;
                return Some(byte & (1 << (bit_index % 8)) != 0);
            }
            byte_offset += plan.quantity.div_ceil(8) as usize;
        }
        None
    }
}

/// Modbus master context
///
/// Owns the configuration, statistics and transaction counter; borrows
/// nothing across operations. Generic over the transport so the same
/// orchestration serves TCP sockets, serial ports and test doubles.
pub struct ModbusMaster<T: MasterTransport> {
    config: MasterConfig,
    transport: T,
    transaction_id: u16,
    stats: MasterStats,
    logger: Option<CallbackLogger>,
}

impl<T: MasterTransport> ModbusMaster<T> {
    /// Create a master over the given transport.
    pub fn new(config: MasterConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            transaction_id: 0,
            stats: MasterStats::default(),
            logger: None,
        }
    }

    /// Create a master with an attached traffic logger.
    pub fn with_logger(config: MasterConfig, transport: T, logger: CallbackLogger) -> Self {
        Self {
            config,
            transport,
            transaction_id: 0,
            stats: MasterStats::default(),
            logger: Some(logger),
        }
    }

    /// Get the active configuration.
    pub fn config(&self) -> &MasterConfig {
        &self.config
    }

    /// Get a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Get a snapshot of the statistics.
    pub fn stats(&self) -> MasterStats {
        self.stats.clone()
    }

    /// Reset all statistics counters.
    pub fn reset_stats(&mut self) {
        self.stats = MasterStats::default();
    }

    fn next_transaction_id(&mut self) -> u16 {
        self.transaction_id = self.transaction_id.wrapping_add(1);
        if self.transaction_id == 0 {
            self.transaction_id = 1;
        }
        self.transaction_id
    }

    /// Run one request/response round-trip.
    ///
    /// Encodes the frame, spaces it from the previous one on serial links,
    /// sends, receives, decodes, and validates the echoed slave and (for
    /// TCP) transaction id. Any failure is terminal for the current
    /// operation.
    async fn round_trip(
        &mut self,
        slave_id: SlaveId,
        function: u8,
        request_pdu: &[u8],
    ) -> ModbusResult<DecodedFrame> {
        let tx_id = self.next_transaction_id();

        let mut frame_buf = [0u8; crate::FRAME_BUFFER_SIZE];
        let frame_len = frame::encode_frame(
            self.config.mode,
            tx_id,
            slave_id,
            function,
            request_pdu,
            &mut frame_buf,
        )?;

        if let Some(logger) = &self.logger {
            logger.log_frame("TX", self.config.mode, &frame_buf[..frame_len]);
        }

        if self.config.mode.is_serial() && self.config.gap_chars > 0 {
            self.transport.delay_chars(self.config.gap_chars as u16).await;
        }

        self.stats.total_requests += 1;
        let sent = self.transport.send(&frame_buf[..frame_len]).await?;
        self.stats.bytes_sent += sent as u64;

        let mut recv_buf = [0u8; crate::FRAME_BUFFER_SIZE];
        let received = self.transport.recv(&mut recv_buf).await?;
        if received == 0 {
            return Err(ModbusError::timeout("receive", self.config.timeout_ms));
        }
        self.stats.bytes_received += received as u64;

        if let Some(logger) = &self.logger {
            logger.log_frame("RX", self.config.mode, &recv_buf[..received]);
        }

        let decoded = frame::decode_frame(self.config.mode, &recv_buf[..received])?;

        if decoded.slave_id != slave_id {
            return Err(ModbusError::invalid_frame(format!(
                "response from slave {} instead of {}",
                decoded.slave_id, slave_id
            )));
        }
        if self.config.mode == ModbusMode::Tcp {
            if let Some(echoed) = decoded.transaction_id {
                if echoed != tx_id {
                    return Err(ModbusError::invalid_frame(format!(
                        "transaction id {} instead of {}",
                        echoed, tx_id
                    )));
                }
            }
        }

        self.stats.total_responses += 1;

        if let Some(logger) = &self.logger {
            logger.log_response(decoded.slave_id, decoded.function, &decoded.pdu);
        }

        Ok(decoded)
    }

    /// Execute one read plan and parse its payload.
    async fn execute_read_plan(&mut self, plan: &RequestPlan) -> ModbusResult<ResponseData> {
        if let Some(logger) = &self.logger {
            logger.log_request(
                plan.slave_id,
                plan.function.to_u8(),
                plan.start_address,
                plan.quantity,
            );
        }

        let mut pdu = [0u8; 4];
        pdu[0..2].copy_from_slice(&plan.start_address.to_be_bytes());
        pdu[2..4].copy_from_slice(&plan.quantity.to_be_bytes());

        let decoded = self
            .round_trip(plan.slave_id, plan.function.to_u8(), &pdu)
            .await?;

        response::parse_read_response(decoded.function, &decoded.pdu, plan.quantity)
    }

    /// Read a single contiguous range (FC01-04).
    pub async fn read_single(
        &mut self,
        slave_id: SlaveId,
        function: ModbusFunction,
        start_address: u16,
        quantity: u16,
    ) -> ModbusResult<ResponseData> {
        validation::validate_slave_id(slave_id)?;
        if !matches!(
            function,
            ModbusFunction::ReadCoils
                | ModbusFunction::ReadDiscreteInputs
                | ModbusFunction::ReadHoldingRegisters
                | ModbusFunction::ReadInputRegisters
        ) {
            return Err(ModbusError::invalid_function(function.to_u8()));
        }
        validation::validate_quantity(quantity, function.max_quantity())?;
        validation::validate_address_range(start_address, quantity)?;

        let plan = RequestPlan {
            slave_id,
            function,
            start_address,
            quantity,
        };
        self.execute_read_plan(&plan).await
    }

    /// Read possibly non-contiguous addresses with the minimum number of
    /// round-trips.
    ///
    /// Plans execute in the order the optimizer produced them; the merged
    /// data lands in [`OptimizedRead`] in that same order. The operation
    /// aborts on the first failing plan.
    pub async fn read_optimized(&mut self, request: &ReadRequest) -> ModbusResult<OptimizedRead> {
        request.validate()?;

        let blocks = block::addresses_to_blocks(
            &request.addresses,
            request.slave_id,
            request.function,
            self.config.max_blocks,
        )?;
        let block_count = blocks.len();
        let plans = optimizer::optimize_blocks(blocks, &self.config)?;

        let timer = OperationTimer::start("optimized read");

        let mut bit_data: Vec<u8> = Vec::new();
        let mut register_data: Vec<u16> = Vec::new();
        for plan in &plans {
            match self.execute_read_plan(plan).await? {
                ResponseData::Bits(mut bytes) => bit_data.append(&mut bytes),
                ResponseData::Registers(mut regs) => register_data.append(&mut regs),
            }
        }

        timer.stop();

        self.stats.optimized_requests += 1;
        self.stats.rounds_saved += (block_count.saturating_sub(plans.len())) as u64;
        self.stats.blocks_merged +=
            (request.addresses.len().saturating_sub(plans.len())) as u64;

        let data = match request.function.unit_kind() {
            crate::policy::UnitKind::Bit => ResponseData::Bits(bit_data),
            crate::policy::UnitKind::Register => ResponseData::Registers(register_data),
        };

        Ok(OptimizedRead { plans, data })
    }

    /// Write a single coil (FC05), validating the device echo.
    pub async fn write_single_coil(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        value: bool,
    ) -> ModbusResult<()> {
        validation::validate_slave_id(slave_id)?;

        let raw: u16 = if value { 0xFF00 } else { 0x0000 };
        if let Some(logger) = &self.logger {
            logger.log_request(slave_id, 0x05, address, 1);
        }

        let mut pdu = [0u8; 4];
        pdu[0..2].copy_from_slice(&address.to_be_bytes());
        pdu[2..4].copy_from_slice(&raw.to_be_bytes());

        let decoded = self.round_trip(slave_id, 0x05, &pdu).await?;
        response::parse_write_response(decoded.function, &decoded.pdu, address, 1, Some(raw))
    }

    /// Write a single register (FC06), validating the device echo.
    pub async fn write_single_register(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        value: u16,
    ) -> ModbusResult<()> {
        validation::validate_slave_id(slave_id)?;

        if let Some(logger) = &self.logger {
            logger.log_request(slave_id, 0x06, address, 1);
        }

        let mut pdu = [0u8; 4];
        pdu[0..2].copy_from_slice(&address.to_be_bytes());
        pdu[2..4].copy_from_slice(&value.to_be_bytes());

        let decoded = self.round_trip(slave_id, 0x06, &pdu).await?;
        response::parse_write_response(decoded.function, &decoded.pdu, address, 1, Some(value))
    }

    /// Write multiple coils (FC15), validating the echoed quantity.
    pub async fn write_multiple_coils(
        &mut self,
        slave_id: SlaveId,
        start_address: u16,
        values: &[bool],
    ) -> ModbusResult<()> {
        validation::validate_slave_id(slave_id)?;
        let quantity = values.len() as u16;
        validation::validate_quantity(
            quantity,
            ModbusFunction::WriteMultipleCoils.max_quantity(),
        )?;
        validation::validate_address_range(start_address, quantity)?;

        if let Some(logger) = &self.logger {
            logger.log_request(slave_id, 0x0F, start_address, quantity);
        }

        let byte_count = values.len().div_ceil(8);
        let mut pdu = Vec::with_capacity(5 + byte_count);
        pdu.extend_from_slice(&start_address.to_be_bytes());
        pdu.extend_from_slice(&quantity.to_be_bytes());
        pdu.push(byte_count as u8);

        let mut packed = vec![0u8; byte_count];
        for (i, &coil) in values.iter().enumerate() {
            if coil {
                packed[i / 8] |= 1 << (i % 8);
            }
        }
        pdu.extend_from_slice(&packed);

        let decoded = self.round_trip(slave_id, 0x0F, &pdu).await?;
        response::parse_write_response(
            decoded.function,
            &decoded.pdu,
            start_address,
            quantity,
            None,
        )
    }

    /// Write multiple registers (FC16), validating the echoed span.
    pub async fn write_multiple_registers(
        &mut self,
        slave_id: SlaveId,
        start_address: u16,
        values: &[u16],
    ) -> ModbusResult<()> {
        validation::validate_slave_id(slave_id)?;
        let quantity = values.len() as u16;
        validation::validate_quantity(
            quantity,
            ModbusFunction::WriteMultipleRegisters.max_quantity(),
        )?;
        validation::validate_address_range(start_address, quantity)?;

        if let Some(logger) = &self.logger {
            logger.log_request(slave_id, 0x10, start_address, quantity);
        }

        let mut pdu = Vec::with_capacity(5 + values.len() * 2);
        pdu.extend_from_slice(&start_address.to_be_bytes());
        pdu.extend_from_slice(&quantity.to_be_bytes());
        pdu.push((quantity * 2) as u8);
        for &value in values {
            pdu.extend_from_slice(&value.to_be_bytes());
        }

        let decoded = self.round_trip(slave_id, 0x10, &pdu).await?;
        response::parse_write_response(
            decoded.function,
            &decoded.pdu,
            start_address,
            quantity,
            None,
        )
    }
}
