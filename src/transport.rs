//! Transport layer abstraction and implementations.
//!
//! The master drives any byte transport through [`MasterTransport`]: a send,
//! a receive, and an optional character-time delay used by the serial modes
//! for inter-frame spacing. Implementations own their timeout enforcement;
//! the master only interprets "zero bytes received" as a timeout.
//!
//! A tokio TCP implementation ships with the crate; a serial port
//! implementation is available behind the `serial` feature.

use crate::error::{ModbusError, ModbusResult};
use async_trait::async_trait;
use bytes::BytesMut;
use log::debug;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Receive buffer size: covers the largest ASCII frame with margin
const RECV_BUFFER_SIZE: usize = crate::FRAME_BUFFER_SIZE;

/// Byte transport consumed by the master.
///
/// Callbacks must not re-enter the master that invoked them. A master issues
/// at most one `send`/`recv` pair at a time; implementations need no
/// internal queueing.
#[async_trait]
pub trait MasterTransport: Send {
    /// Send a complete frame, returning the number of bytes written.
    async fn send(&mut self, frame: &[u8]) -> ModbusResult<usize>;

    /// Receive one response frame into `buffer`, returning the byte count.
    ///
    /// Returning zero bytes means the peer produced nothing; the master
    /// surfaces it as `Timeout`.
    async fn recv(&mut self, buffer: &mut [u8]) -> ModbusResult<usize>;

    /// Pause for `chars` character times before the next frame.
    ///
    /// Serial modes use this for the inter-frame gap; transports without a
    /// character clock may leave the default no-op.
    async fn delay_chars(&mut self, chars: u16) {
        let _ = chars;
    }
}

/// Modbus TCP transport over a tokio stream.
pub struct TcpTransport {
    stream: Option<TcpStream>,
    /// Remote address the transport connects to
    pub address: SocketAddr,
    timeout: Duration,
    read_buf: BytesMut,
}

impl TcpTransport {
    /// Connect to a Modbus TCP endpoint.
    pub async fn connect(address: SocketAddr, timeout_duration: Duration) -> ModbusResult<Self> {
        let stream = timeout(timeout_duration, TcpStream::connect(address))
            .await
            .map_err(|_| {
                ModbusError::timeout("connect", timeout_duration.as_millis() as u64)
            })?
            .map_err(|e| {
                ModbusError::transport(format!("failed to connect to {}: {}", address, e))
            })?;

        Ok(Self {
            stream: Some(stream),
            address,
            timeout: timeout_duration,
            read_buf: BytesMut::with_capacity(RECV_BUFFER_SIZE),
        })
    }

    /// Connect using an address string like `"127.0.0.1:502"`.
    pub async fn from_address(address: &str, timeout_duration: Duration) -> ModbusResult<Self> {
        let address: SocketAddr = address
            .parse()
            .map_err(|e| ModbusError::invalid_param(format!("invalid address: {}", e)))?;
        Self::connect(address, timeout_duration).await
    }

    /// Re-establish a dropped connection.
    pub async fn reconnect(&mut self) -> ModbusResult<()> {
        self.stream = None;
        let stream = TcpStream::connect(self.address).await.map_err(|e| {
            ModbusError::transport(format!("failed to reconnect to {}: {}", self.address, e))
        })?;
        self.stream = Some(stream);
        debug!("reconnected to {}", self.address);
        Ok(())
    }

    /// Check if the transport holds a live stream.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Shut the connection down.
    pub async fn close(&mut self) -> ModbusResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        Ok(())
    }

}

#[async_trait]
impl MasterTransport for TcpTransport {
    async fn send(&mut self, frame: &[u8]) -> ModbusResult<usize> {
        let deadline = self.timeout;
        let result = {
            let stream = self
                .stream
                .as_mut()
                .ok_or_else(|| ModbusError::transport("connection is closed"))?;
            timeout(deadline, stream.write_all(frame)).await
        };

        match result {
            Ok(Ok(())) => Ok(frame.len()),
            Ok(Err(e)) => {
                self.stream = None;
                Err(ModbusError::transport(format!("send failed: {}", e)))
            }
            Err(_) => {
                self.stream = None;
                Err(ModbusError::timeout("send", deadline.as_millis() as u64))
            }
        }
    }

    async fn recv(&mut self, buffer: &mut [u8]) -> ModbusResult<usize> {
        let deadline = self.timeout;
        self.read_buf.clear();
        self.read_buf.resize(buffer.len().min(RECV_BUFFER_SIZE), 0);

        let result = {
            let stream = self
                .stream
                .as_mut()
                .ok_or_else(|| ModbusError::transport("connection is closed"))?;
            timeout(deadline, stream.read(&mut self.read_buf)).await
        };

        let n = match result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                self.stream = None;
                return Err(ModbusError::transport(format!("receive failed: {}", e)));
            }
            Err(_) => {
                return Err(ModbusError::timeout("receive", deadline.as_millis() as u64));
            }
        };

        buffer[..n].copy_from_slice(&self.read_buf[..n]);
        Ok(n)
    }
}

/// Modbus serial transport (RTU/ASCII) over a tokio serial port.
///
/// `delay_chars` is implemented against the configured baudrate assuming the
/// usual 11-bit character (start + 8 data + parity + stop).
#[cfg(feature = "serial")]
pub struct SerialTransport {
    port: tokio_serial::SerialStream,
    baud_rate: u32,
    timeout: Duration,
}

#[cfg(feature = "serial")]
impl SerialTransport {
    /// Open a serial port at the given baudrate.
    pub fn open(path: &str, baud_rate: u32, timeout_duration: Duration) -> ModbusResult<Self> {
        use tokio_serial::SerialPortBuilderExt;

        let port = tokio_serial::new(path, baud_rate)
            .open_native_async()
            .map_err(|e| ModbusError::transport(format!("failed to open {}: {}", path, e)))?;

        Ok(Self {
            port,
            baud_rate,
            timeout: timeout_duration,
        })
    }

    fn char_time(&self, chars: u16) -> Duration {
        // 11 bit times per character
        let micros = chars as u64 * 11 * 1_000_000 / self.baud_rate.max(1) as u64;
        Duration::from_micros(micros)
    }
}

#[cfg(feature = "serial")]
#[async_trait]
impl MasterTransport for SerialTransport {
    async fn send(&mut self, frame: &[u8]) -> ModbusResult<usize> {
        match timeout(self.timeout, self.port.write_all(frame)).await {
            Ok(Ok(())) => Ok(frame.len()),
            Ok(Err(e)) => Err(ModbusError::transport(format!("send failed: {}", e))),
            Err(_) => Err(ModbusError::timeout(
                "send",
                self.timeout.as_millis() as u64,
            )),
        }
    }

    async fn recv(&mut self, buffer: &mut [u8]) -> ModbusResult<usize> {
        match timeout(self.timeout, self.port.read(buffer)).await {
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) => Err(ModbusError::transport(format!("receive failed: {}", e))),
            Err(_) => Err(ModbusError::timeout(
                "receive",
                self.timeout.as_millis() as u64,
            )),
        }
    }

    async fn delay_chars(&mut self, chars: u16) {
        if chars > 0 {
            tokio::time::sleep(self.char_time(chars)).await;
        }
    }
}
