//! Reader and writer halves over any tokio byte stream

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::*;
use crate::{TransportReader, TransportWriter};

/// Buffered read half
pub struct StreamReader<R> {
    inner: BufReader<R>,
    receive_timeout: Option<Duration>,
}

impl<R: AsyncRead + Unpin + Send> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            receive_timeout: None,
        }
    }

    /// Bound each `receive` call; `wait_readable` is never bounded
    pub fn with_receive_timeout(mut self, limit: Option<Duration>) -> Self {
        self.receive_timeout = limit;
        self
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> TransportReader for StreamReader<R> {
    async fn wait_readable(&mut self) -> Result<()> {
        let available = self.inner.fill_buf().await?;
        if available.is_empty() {
            return Err(Error::ConnectionClosed);
        }
        Ok(())
    }

    async fn receive(&mut self, max_len: usize) -> Result<Bytes> {
        let fill = self.inner.fill_buf();
        let available = match self.receive_timeout {
            Some(limit) => timeout(limit, fill).await.map_err(|_| Error::ReadTimeout)??,
            None => fill.await?,
        };

        if available.is_empty() {
            return Err(Error::ConnectionClosed);
        }

        let n = available.len().min(max_len);
        let chunk = Bytes::copy_from_slice(&available[..n]);
        self.inner.consume(n);

        trace!("Received {} bytes: {}", n, hex::encode(&chunk));

        Ok(chunk)
    }
}

/// Write half; every send is flushed before returning
pub struct StreamWriter<W> {
    inner: W,
    closed: bool,
}

impl<W: AsyncWrite + Unpin + Send> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            closed: false,
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> TransportWriter for StreamWriter<W> {
    async fn send(&mut self, data: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::NotConnected);
        }

        trace!("Sending {} bytes: {}", data.len(), hex::encode(data));

        self.inner.write_all(data).await?;
        self.inner.flush().await?;

        Ok(data.len())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Err(e) = self.inner.shutdown().await {
            debug!("Shutdown of write half failed: {}", e);
        }
        Ok(())
    }
}
