//! Byte-stream link for the text protocol.
//!
//! Commands are written as one line. Replies are read up to and including
//! the closing `]`; anything after it stays buffered for the next read.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use racing_wheel_hid_openffboard_protocol::{COMMAND_TERMINATOR, REPLY_TERMINATOR};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::Link;
#[cfg(feature = "serial")]
use super::{Connector, LinkKind};

const READ_CHUNK: usize = 256;

/// Replies longer than this without a terminator are treated as line noise.
const MAX_PENDING: usize = 4096;

pub struct StreamLink<S> {
    stream: S,
    pending: Vec<u8>,
}

impl<S> StreamLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            pending: Vec::with_capacity(READ_CHUNK),
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    fn take_frame(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.iter().position(|b| *b == REPLY_TERMINATOR)?;
        Some(self.pending.drain(..=end).collect())
    }
}

#[async_trait]
impl<S> Link for StreamLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        let mut line = Vec::with_capacity(frame.len() + 1);
        line.extend_from_slice(frame);
        line.push(COMMAND_TERMINATOR);
        self.stream.write_all(&line).await?;
        self.stream.flush().await
    }

    async fn receive(&mut self) -> io::Result<Vec<u8>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = self.take_frame() {
                return Ok(frame);
            }
            if self.pending.len() > MAX_PENDING {
                tracing::warn!(bytes = self.pending.len(), "dropping unterminated serial input");
                self.pending.clear();
            }
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "serial stream closed",
                ));
            }
            self.pending.extend_from_slice(chunk.get(..n).unwrap_or_default());
        }
    }

    async fn discard_input(&mut self) -> io::Result<()> {
        let mut dropped = std::mem::take(&mut self.pending).len();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match tokio::time::timeout(Duration::ZERO, self.stream.read(&mut chunk)).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(n)) => dropped += n,
                Ok(Err(err)) => return Err(err),
            }
        }
        if dropped > 0 {
            tracing::debug!(bytes = dropped, "discarded stale serial input");
        }
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

/// Opens the board's CDC serial port: 8N1, no flow control, DTR asserted.
#[cfg(feature = "serial")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConnector {
    pub port: String,
    pub baud_rate: u32,
}

#[cfg(feature = "serial")]
impl SerialConnector {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
        }
    }
}

#[cfg(feature = "serial")]
#[async_trait]
impl Connector for SerialConnector {
    fn kind(&self) -> LinkKind {
        LinkKind::Text
    }

    fn endpoint(&self) -> String {
        format!("{}@{}", self.port, self.baud_rate)
    }

    async fn connect(&self) -> io::Result<Box<dyn Link>> {
        use tokio_serial::{DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, StopBits};

        let mut stream = tokio_serial::new(&self.port, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(io::Error::from)?;
        stream
            .write_data_terminal_ready(true)
            .map_err(io::Error::from)?;
        Ok(Box::new(StreamLink::new(stream)))
    }
}
