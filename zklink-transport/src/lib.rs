//! Transport layer for ZKTeco protocol
//!
//! A [`Transport`] opens a byte stream to one terminal and is then split into
//! a reader, owned by the receive task, and a writer, shared by every request.

pub mod error;
pub mod memory;
pub mod stream;
pub mod tcp;

pub use error::{Error, Result};
pub use memory::MemoryTransport;
pub use stream::{StreamReader, StreamWriter};
pub use tcp::TcpTransport;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

/// Transport trait for different communication methods
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to device
    async fn connect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Get remote address
    fn remote_addr(&self) -> String;

    /// Split a connected transport into independently owned halves
    fn into_split(self: Box<Self>) -> Result<(Box<dyn TransportReader>, Box<dyn TransportWriter>)>;
}

/// Read half of a connected transport
#[async_trait]
pub trait TransportReader: Send {
    /// Resolve once at least one byte can be read without blocking
    ///
    /// Fails with [`Error::ConnectionClosed`] when the peer has closed the stream.
    async fn wait_readable(&mut self) -> Result<()>;

    /// Read up to `max_len` bytes; may return fewer
    async fn receive(&mut self, max_len: usize) -> Result<Bytes>;

    /// Read exactly `len` bytes, looping over short reads
    async fn receive_exact(&mut self, len: usize) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(len);

        while buf.len() < len {
            let chunk = self.receive(len - buf.len()).await?;
            if chunk.is_empty() {
                return Err(Error::ConnectionClosed);
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(buf)
    }
}

/// Write half of a connected transport
#[async_trait]
pub trait TransportWriter: Send {
    /// Send raw bytes; returns once every byte was written
    async fn send(&mut self, data: &[u8]) -> Result<usize>;

    /// Close the write side
    async fn disconnect(&mut self) -> Result<()>;
}
