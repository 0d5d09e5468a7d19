//! Text command codec for the CDC serial link.
//!
//! # Grammar
//! ```text
//! command = prefix "." [instance "."] name op
//! op      = "?"                read
//!         | "?" addr           addressed read
//!         | "=" value          write
//!         | "=" value "?" addr addressed write
//!         | "!"                info
//! reply   = "[" command "|" data [":" addr] "]"
//! ```
//!
//! A reply only answers a request when its left segment is byte-for-byte the
//! command string that was sent. The one exception is the system error
//! sentinel, which the firmware pushes unsolicited and which always decodes
//! as an error.

use std::fmt::Write as _;

use crate::classes::SYSTEM_ERROR_SENTINEL;
use crate::codec::WireCodec;
use crate::command::{Decoded, Operation, Outcome, ReplyData, Request, Response};
use crate::error::{ProtocolError, ProtocolResult};

/// Byte that closes every reply.
pub const REPLY_TERMINATOR: u8 = b']';

/// Line ending appended to every command on the wire.
pub const COMMAND_TERMINATOR: u8 = b'\n';

/// Reply word for an unknown command.
pub const NOT_FOUND_WORD: &str = "NOT_FOUND";

/// Reply word for a command the firmware refused.
pub const ERROR_WORD: &str = "ERR";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextCodec;

impl TextCodec {
    /// Build the command string for `request`, without line ending.
    pub fn command_string(request: &Request<'_>) -> ProtocolResult<String> {
        let mut out = String::with_capacity(32);
        out.push_str(request.class.prefix);
        out.push('.');
        if let Some(instance) = request.instance {
            let _ = write!(out, "{instance}.");
        }
        out.push_str(request.descriptor.name);

        let address = request.address.unwrap_or(0);
        match request.operation {
            Operation::Read => out.push('?'),
            Operation::ReadAddressed => {
                let _ = write!(out, "?{address}");
            }
            Operation::Write => {
                out.push('=');
                out.push_str(&payload_text(request)?);
            }
            Operation::WriteAddressed => {
                out.push('=');
                out.push_str(&payload_text(request)?);
                let _ = write!(out, "?{address}");
            }
            Operation::Info => out.push('!'),
        }
        Ok(out)
    }

    /// Correlate one reply with the request it should answer.
    pub fn decode_reply(request: &Request<'_>, reply: &str) -> Decoded {
        // Bytes ahead of the opening bracket are line noise.
        let Some((_, body)) = reply.trim().split_once('[') else {
            return Decoded::Unmatched;
        };
        let body = body.strip_suffix(']').unwrap_or(body);
        let Some((echo, data)) = body.split_once('|') else {
            return Decoded::Unmatched;
        };

        let Ok(expected) = Self::command_string(request) else {
            return Decoded::Unmatched;
        };

        if echo == expected {
            let (data, address) = split_address(data)
                .unwrap_or((data, request.address.unwrap_or(0)));
            let outcome = match data.trim() {
                NOT_FOUND_WORD => Outcome::NotFound,
                ERROR_WORD => Outcome::Error,
                _ => Outcome::Acknowledgment,
            };
            return Decoded::Matched(response(request, outcome, data, address));
        }

        if echo == SYSTEM_ERROR_SENTINEL {
            return Decoded::Matched(response(request, Outcome::Error, data, 0));
        }

        tracing::trace!(echo, expected = %expected, "reply does not answer pending command");
        Decoded::Unmatched
    }
}

fn payload_text(request: &Request<'_>) -> ProtocolResult<String> {
    request
        .payload
        .as_ref()
        .map(|value| value.to_text_payload())
        .ok_or(ProtocolError::MissingPayload(request.descriptor.name))
}

/// Split `data:addr`, only when the part after the first colon is a number.
fn split_address(data: &str) -> Option<(&str, u64)> {
    let (value, address) = data.split_once(':')?;
    let address = address.trim().parse().ok()?;
    Some((value, address))
}

fn response(request: &Request<'_>, outcome: Outcome, data: &str, address: u64) -> Response {
    Response {
        outcome,
        class_id: request.class.class_id,
        instance: request.instance.unwrap_or(0),
        command_id: request.descriptor.id,
        data: ReplyData::Text(data.to_string()),
        address,
    }
}

impl WireCodec for TextCodec {
    fn link_name(&self) -> &'static str {
        "text"
    }

    fn carries_text(&self) -> bool {
        true
    }

    fn encode(&self, request: &Request<'_>) -> ProtocolResult<Vec<u8>> {
        Self::command_string(request).map(String::into_bytes)
    }

    fn decode(&self, request: &Request<'_>, frame: &[u8]) -> Decoded {
        Self::decode_reply(request, &String::from_utf8_lossy(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::{AXIS, SYSTEM, TMC4671};
    use crate::value::Value;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn matched(decoded: Decoded) -> Result<Response, Box<dyn std::error::Error>> {
        match decoded {
            Decoded::Matched(r) => Ok(r),
            Decoded::Unmatched => Err("reply was not matched".into()),
        }
    }

    #[test]
    fn write_with_instance() -> TestResult {
        let power = AXIS.parameter("power")?;
        let req = Request::write(&AXIS, power, Value::UInt(500)).with_instance(Some(0));
        assert_eq!(TextCodec::command_string(&req)?, "axis.0.power=500");
        Ok(())
    }

    #[test]
    fn acknowledged_write_decodes() -> TestResult {
        let power = AXIS.parameter("power")?;
        let req = Request::write(&AXIS, power, Value::UInt(500)).with_instance(Some(0));
        let resp = matched(TextCodec::decode_reply(&req, "[axis.0.power=500|OK]"))?;
        assert_eq!(resp.outcome, Outcome::Acknowledgment);
        assert_eq!(resp.data, ReplyData::Text("OK".into()));
        assert!(resp.acknowledges(&req));
        Ok(())
    }

    #[test]
    fn addressed_read_splits_address() -> TestResult {
        let reg = TMC4671.parameter("reg")?;
        let req = Request::read_at(&TMC4671, reg, 3);
        assert_eq!(TextCodec::command_string(&req)?, "tmc.reg?3");
        let resp = matched(TextCodec::decode_reply(&req, "[tmc.reg?3|42:3]"))?;
        assert_eq!(resp.data, ReplyData::Text("42".into()));
        assert_eq!(resp.address, 3);
        Ok(())
    }

    #[test]
    fn addressed_write_and_info_operators() -> TestResult {
        let reg = TMC4671.parameter("reg")?;
        let req = Request::write_at(&TMC4671, reg, Value::UInt(7), 12);
        assert_eq!(TextCodec::command_string(&req)?, "tmc.reg=7?12");

        let help = AXIS.parameter("help")?;
        assert_eq!(TextCodec::command_string(&Request::info(&AXIS, help))?, "axis.help!");
        Ok(())
    }

    #[test]
    fn bool_writes_as_digit() -> TestResult {
        let debug = SYSTEM.parameter("debug")?;
        let req = Request::write(&SYSTEM, debug, Value::Bool(true));
        assert_eq!(TextCodec::command_string(&req)?, "sys.debug=1");
        Ok(())
    }

    #[test]
    fn address_falls_back_to_request() -> TestResult {
        let pos = AXIS.parameter("pos")?;
        let req = Request::read(&AXIS, pos);
        let resp = matched(TextCodec::decode_reply(&req, "[axis.pos?|-1200]\r\n"))?;
        assert_eq!(resp.data, ReplyData::Text("-1200".into()));
        assert_eq!(resp.address, 0);
        Ok(())
    }

    #[test]
    fn non_numeric_colon_stays_in_data() -> TestResult {
        let lsactive = SYSTEM.parameter("lsactive")?;
        let req = Request::read(&SYSTEM, lsactive);
        let resp = matched(TextCodec::decode_reply(&req, "[sys.lsactive?|FFB:axis:0]"))?;
        assert_eq!(resp.data, ReplyData::Text("FFB:axis:0".into()));
        Ok(())
    }

    #[test]
    fn mismatched_echo_is_dropped() -> TestResult {
        let power = AXIS.parameter("power")?;
        let req = Request::read(&AXIS, power);
        assert_eq!(
            TextCodec::decode_reply(&req, "[axis.degrees?|900]"),
            Decoded::Unmatched
        );
        assert_eq!(TextCodec::decode_reply(&req, "axis.power?|900"), Decoded::Unmatched);
        Ok(())
    }

    #[test]
    fn noise_before_bracket_is_skipped() -> TestResult {
        let power = AXIS.parameter("power")?;
        let req = Request::read(&AXIS, power);
        let resp = matched(TextCodec::decode_reply(&req, "xx\u{7f}garbage[axis.power?|900]"))?;
        assert_eq!(resp.data, ReplyData::Text("900".into()));
        Ok(())
    }

    #[test]
    fn sentinel_is_error_for_any_request() -> TestResult {
        let power = AXIS.parameter("power")?;
        let req = Request::read(&AXIS, power);
        let resp = matched(TextCodec::decode_reply(&req, "[sys.0.errors?|3:2:Overtemp]"))?;
        assert_eq!(resp.outcome, Outcome::Error);
        assert_eq!(resp.data, ReplyData::Text("3:2:Overtemp".into()));
        assert_eq!(resp.class_id, AXIS.class_id);
        Ok(())
    }

    #[test]
    fn firmware_reply_words() -> TestResult {
        let power = AXIS.parameter("power")?;
        let req = Request::read(&AXIS, power);
        let resp = matched(TextCodec::decode_reply(&req, "[axis.power?|NOT_FOUND]"))?;
        assert_eq!(resp.outcome, Outcome::NotFound);
        let resp = matched(TextCodec::decode_reply(&req, "[axis.power?|ERR]"))?;
        assert_eq!(resp.outcome, Outcome::Error);
        Ok(())
    }

    #[test]
    fn write_without_payload_is_rejected() -> TestResult {
        let power = AXIS.parameter("power")?;
        let mut req = Request::read(&AXIS, power);
        req.operation = Operation::Write;
        assert_eq!(
            TextCodec::command_string(&req),
            Err(ProtocolError::MissingPayload("power"))
        );
        Ok(())
    }
}
