//! In-process transport over a tokio duplex pipe
//!
//! The far end of the pipe plays the terminal. Used by tests and demos that
//! run without hardware.

use async_trait::async_trait;
use tokio::io::DuplexStream;
use tracing::debug;

use crate::stream::{StreamReader, StreamWriter};
use crate::{Transport, TransportReader, TransportWriter, error::*};

/// Transport backed by one end of a [`tokio::io::duplex`] pipe
pub struct MemoryTransport {
    name: String,
    stream: Option<DuplexStream>,
    connected: bool,
}

impl MemoryTransport {
    /// Create a transport and hand back the peer end of the pipe
    pub fn pair(name: impl Into<String>, capacity: usize) -> (Self, DuplexStream) {
        let (local, remote) = tokio::io::duplex(capacity);
        let transport = Self {
            name: name.into(),
            stream: Some(local),
            connected: false,
        };
        (transport, remote)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Err(Error::AlreadyConnected);
        }
        if self.stream.is_none() {
            return Err(Error::ConnectionClosed);
        }

        debug!("Connected to in-memory peer {}", self.name);
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected && self.stream.is_some()
    }

    fn remote_addr(&self) -> String {
        format!("memory://{}", self.name)
    }

    fn into_split(
        mut self: Box<Self>,
    ) -> Result<(Box<dyn TransportReader>, Box<dyn TransportWriter>)> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let stream = self.stream.take().ok_or(Error::NotConnected)?;
        let (read_half, write_half) = tokio::io::split(stream);

        Ok((
            Box::new(StreamReader::new(read_half)),
            Box::new(StreamWriter::new(write_half)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_memory_round_trip() {
        let (mut transport, mut peer) = MemoryTransport::pair("dev-1", 1024);
        assert_eq!(transport.remote_addr(), "memory://dev-1");
        assert!(!transport.is_connected());

        transport.connect().await.unwrap();
        assert!(transport.is_connected());
        assert!(matches!(transport.connect().await, Err(Error::AlreadyConnected)));

        let (mut reader, mut writer) = Box::new(transport).into_split().unwrap();

        writer.send(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        peer.write_all(b"pong").await.unwrap();
        assert_eq!(&reader.receive_exact(4).await.unwrap()[..], b"pong");
    }

    #[tokio::test]
    async fn test_memory_split_requires_connect() {
        let (transport, _peer) = MemoryTransport::pair("dev-1", 64);
        assert!(matches!(
            Box::new(transport).into_split(),
            Err(Error::NotConnected)
        ));
    }
}
