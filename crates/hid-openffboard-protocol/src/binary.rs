//! Fixed 25-byte command frame for the HID link.
//!
//! Layout (little-endian):
//!
//! | offset | size | field                 |
//! |--------|------|-----------------------|
//! | 0      | 1    | magic / report id 0xA1 |
//! | 1      | 1    | operation tag         |
//! | 2      | 2    | class id              |
//! | 4      | 1    | instance              |
//! | 5      | 4    | command id            |
//! | 9      | 8    | payload               |
//! | 17     | 8    | address               |

use crate::codec::WireCodec;
use crate::command::{Decoded, Outcome, ReplyData, Request, Response};
use crate::error::{ProtocolError, ProtocolResult};

pub const FRAME_LEN: usize = 25;

/// First byte of every command frame. Doubles as the HID report id.
pub const FRAME_MAGIC: u8 = 0xA1;

/// One decoded or to-be-encoded command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinaryFrame {
    pub tag: u8,
    pub class_id: u16,
    pub instance: u8,
    pub command_id: u32,
    pub payload: u64,
    pub address: u64,
}

impl BinaryFrame {
    /// Build the frame for `request`. Unused fields are zero.
    pub fn from_request(request: &Request<'_>) -> ProtocolResult<Self> {
        let payload = match &request.payload {
            None => 0,
            Some(value) => value.to_wire().ok_or(ProtocolError::UnsupportedPayload {
                kind: value.kind(),
                link: BinaryCodec::LINK,
            })?,
        };
        Ok(Self {
            tag: request.operation.tag(),
            class_id: request.class.class_id,
            instance: request.instance.unwrap_or(0),
            command_id: request.descriptor.id,
            payload,
            address: request.address.unwrap_or(0),
        })
    }

    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        let mut out = [0u8; FRAME_LEN];
        out[0] = FRAME_MAGIC;
        out[1] = self.tag;
        out[2..4].copy_from_slice(&self.class_id.to_le_bytes());
        out[4] = self.instance;
        out[5..9].copy_from_slice(&self.command_id.to_le_bytes());
        out[9..17].copy_from_slice(&self.payload.to_le_bytes());
        out[17..25].copy_from_slice(&self.address.to_le_bytes());
        out
    }

    /// Parse a frame. Trailing bytes beyond [`FRAME_LEN`] are ignored.
    pub fn parse(data: &[u8]) -> ProtocolResult<Self> {
        if data.len() < FRAME_LEN {
            return Err(ProtocolError::InvalidLength {
                expected: FRAME_LEN,
                actual: data.len(),
            });
        }
        if data[0] != FRAME_MAGIC {
            return Err(ProtocolError::BadMagic {
                expected: FRAME_MAGIC,
                actual: data[0],
            });
        }
        Ok(Self {
            tag: data[1],
            class_id: u16::from_le_bytes([data[2], data[3]]),
            instance: data[4],
            command_id: u32::from_le_bytes([data[5], data[6], data[7], data[8]]),
            payload: u64::from_le_bytes(le_bytes(&data[9..17])),
            address: u64::from_le_bytes(le_bytes(&data[17..25])),
        })
    }

    pub fn outcome(&self) -> Option<Outcome> {
        Outcome::from_tag(self.tag)
    }

    /// Payload as the signed value the firmware sends.
    pub fn signed_payload(&self) -> i64 {
        i64::from_le_bytes(self.payload.to_le_bytes())
    }
}

fn le_bytes(slice: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(slice);
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryCodec;

impl BinaryCodec {
    pub const LINK: &'static str = "binary";
}

impl WireCodec for BinaryCodec {
    fn link_name(&self) -> &'static str {
        Self::LINK
    }

    fn carries_text(&self) -> bool {
        false
    }

    fn encode(&self, request: &Request<'_>) -> ProtocolResult<Vec<u8>> {
        BinaryFrame::from_request(request).map(|frame| frame.to_bytes().to_vec())
    }

    fn decode(&self, request: &Request<'_>, frame: &[u8]) -> Decoded {
        let parsed = match BinaryFrame::parse(frame) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::trace!(error = %err, "dropping malformed report");
                return Decoded::Unmatched;
            }
        };
        let Some(outcome) = parsed.outcome() else {
            tracing::trace!(tag = parsed.tag, "dropping report with unknown tag");
            return Decoded::Unmatched;
        };
        if parsed.class_id != request.class.class_id
            || parsed.command_id != request.descriptor.id
        {
            return Decoded::Unmatched;
        }
        Decoded::Matched(Response {
            outcome,
            class_id: parsed.class_id,
            instance: parsed.instance,
            command_id: parsed.command_id,
            data: ReplyData::Wire(parsed.signed_payload()),
            address: parsed.address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::{AXIS, FX, TMC4671};
    use crate::command::Operation;
    use crate::value::{Value, ValueKind};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn power_write_layout() -> TestResult {
        let power = AXIS.parameter("power")?;
        let req = Request::write(&AXIS, power, Value::UInt(500)).with_instance(Some(0));
        let bytes = BinaryCodec.encode(&req)?;
        assert_eq!(bytes.len(), FRAME_LEN);
        assert_eq!(
            bytes,
            [
                0xA1, 0x00, 0x01, 0x0A, 0x00, 0, 0, 0, 0, 0xF4, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0, 0,
            ]
        );
        Ok(())
    }

    #[test]
    fn missing_instance_encodes_as_zero() -> TestResult {
        let cpr = TMC4671.parameter("cpr")?;
        let frame = BinaryFrame::from_request(&Request::read(&TMC4671, cpr))?;
        assert_eq!(frame.instance, 0);
        assert_eq!(frame.tag, Operation::Read.tag());
        assert_eq!(frame.payload, 0);
        Ok(())
    }

    #[test]
    fn text_payload_is_rejected() -> TestResult {
        let effects = FX.parameter("effects")?;
        let req = Request::write(&FX, effects, Value::Text("0".into()));
        assert_eq!(
            BinaryCodec.encode(&req),
            Err(ProtocolError::UnsupportedPayload {
                kind: ValueKind::Text,
                link: "binary",
            })
        );
        Ok(())
    }

    #[test]
    fn parse_rejects_short_and_bad_magic() {
        assert_eq!(
            BinaryFrame::parse(&[0xA1; 10]),
            Err(ProtocolError::InvalidLength {
                expected: FRAME_LEN,
                actual: 10
            })
        );
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = 0x01;
        assert!(matches!(
            BinaryFrame::parse(&bytes),
            Err(ProtocolError::BadMagic { actual: 0x01, .. })
        ));
    }

    #[test]
    fn acknowledgment_matches_by_class_and_command() -> TestResult {
        let degrees = AXIS.parameter("degrees")?;
        let req = Request::read(&AXIS, degrees);
        let reply = BinaryFrame {
            tag: Outcome::ACKNOWLEDGMENT_TAG,
            class_id: 0xA01,
            instance: 0,
            command_id: degrees.id,
            payload: 900,
            address: 0,
        };
        let Decoded::Matched(resp) = BinaryCodec.decode(&req, &reply.to_bytes()) else {
            return Err("acknowledgment was not matched".into());
        };
        assert_eq!(resp.outcome, Outcome::Acknowledgment);
        assert_eq!(resp.value(ValueKind::UInt)?, Value::UInt(900));
        Ok(())
    }

    #[test]
    fn other_command_is_unmatched() -> TestResult {
        let degrees = AXIS.parameter("degrees")?;
        let power = AXIS.parameter("power")?;
        let reply = BinaryFrame {
            tag: Outcome::ACKNOWLEDGMENT_TAG,
            class_id: 0xA01,
            instance: 0,
            command_id: power.id,
            payload: 1,
            address: 0,
        };
        let req = Request::read(&AXIS, degrees);
        assert_eq!(BinaryCodec.decode(&req, &reply.to_bytes()), Decoded::Unmatched);

        let mut unknown = reply.to_bytes();
        unknown[1] = 11;
        let req = Request::read(&AXIS, power);
        assert_eq!(BinaryCodec.decode(&req, &unknown), Decoded::Unmatched);
        Ok(())
    }

    #[test]
    fn negative_payload_survives() -> TestResult {
        let pos = AXIS.parameter("pos")?;
        let req = Request::read(&AXIS, pos);
        let reply = BinaryFrame {
            tag: Outcome::ACKNOWLEDGMENT_TAG,
            class_id: 0xA01,
            instance: 0,
            command_id: pos.id,
            payload: u64::from_le_bytes((-1200i64).to_le_bytes()),
            address: 0,
        };
        let Decoded::Matched(resp) = BinaryCodec.decode(&req, &reply.to_bytes()) else {
            return Err("reply was not matched".into());
        };
        assert_eq!(resp.data, ReplyData::Wire(-1200));
        Ok(())
    }
}
