//! The codec seam shared by the text and binary links.

use crate::command::{Decoded, Request};
use crate::error::ProtocolResult;

/// Pure request encoder and reply correlator for one link type.
///
/// Implementations hold no state: the same request always encodes to the
/// same bytes, and decoding never consumes anything but the frame it is
/// given.
pub trait WireCodec: Send + Sync {
    /// Short link name used in logs and errors.
    fn link_name(&self) -> &'static str;

    /// Whether text payloads and info queries can travel over this link.
    fn carries_text(&self) -> bool;

    fn encode(&self, request: &Request<'_>) -> ProtocolResult<Vec<u8>>;

    /// Offer one received frame to the pending `request`.
    fn decode(&self, request: &Request<'_>, frame: &[u8]) -> Decoded;
}
