//! Physical links and the connectors that open them.
//!
//! A [`Link`] moves whole frames: a command out, one reply in. It knows
//! nothing about correlation; the session pairs frames with requests through
//! the link's [`WireCodec`].

use std::io;

use async_trait::async_trait;
use racing_wheel_hid_openffboard_protocol::{BinaryCodec, TextCodec, WireCodec};

#[cfg(feature = "hid")]
pub mod hid;
pub mod mock;
pub mod stream;

#[cfg(feature = "hid")]
pub use hid::{HidConnector, HidLink};
pub use stream::StreamLink;
#[cfg(feature = "serial")]
pub use stream::SerialConnector;

/// Wire format spoken over a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// ASCII commands over the CDC serial port.
    Text,
    /// 25-byte frames over the vendor HID report.
    Binary,
}

impl LinkKind {
    pub fn codec(self) -> Box<dyn WireCodec> {
        match self {
            LinkKind::Text => Box::new(TextCodec),
            LinkKind::Binary => Box::new(BinaryCodec),
        }
    }
}

/// An open physical channel.
///
/// `receive` must be cancel-safe: dropping its future may lose the frame
/// being read but must leave the link usable for the next exchange.
#[async_trait]
pub trait Link: Send {
    /// Write one encoded command.
    async fn send(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Wait for the next complete reply frame.
    async fn receive(&mut self) -> io::Result<Vec<u8>>;

    /// Drop everything already buffered or readable without blocking.
    async fn discard_input(&mut self) -> io::Result<()>;

    async fn close(&mut self) -> io::Result<()>;
}

/// Opens links of one kind.
#[async_trait]
pub trait Connector: Send + Sync {
    fn kind(&self) -> LinkKind;

    /// Human-readable endpoint, for logs.
    fn endpoint(&self) -> String;

    async fn connect(&self) -> io::Result<Box<dyn Link>>;
}
