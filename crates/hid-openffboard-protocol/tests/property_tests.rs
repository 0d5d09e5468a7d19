//! Property-based tests for the OpenFFBoard command codecs.
//!
//! Uses proptest with 500 cases to check frame layout, determinism and reply
//! correlation over the built-in class tables.

use proptest::prelude::*;
use racing_wheel_hid_openffboard_protocol::{
    AXIS, BinaryCodec, BinaryFrame, Decoded, FRAME_LEN, FRAME_MAGIC, Operation, Outcome,
    ParameterDescriptor, ReplyData, Request, TMC4671, TextCodec, Value, WireCodec,
};

fn axis_numeric() -> impl Strategy<Value = &'static ParameterDescriptor> {
    let numeric: Vec<&'static ParameterDescriptor> =
        AXIS.iter().filter(|d| !d.is_textual()).collect();
    proptest::sample::select(numeric)
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(500))]

    /// Every binary request is exactly one frame long and starts with the magic.
    #[test]
    fn prop_binary_frame_is_fixed_length(
        descriptor in axis_numeric(),
        instance in proptest::option::of(any::<u8>()),
        payload in any::<u64>(),
        address in any::<u64>(),
    ) {
        let req = Request::write_at(&AXIS, descriptor, Value::UInt(payload), address)
            .with_instance(instance);
        let bytes = BinaryCodec.encode(&req)?;
        prop_assert_eq!(bytes.len(), FRAME_LEN);
        prop_assert_eq!(bytes[0], FRAME_MAGIC);
        prop_assert_eq!(bytes[4], instance.unwrap_or(0));
    }

    /// Frame fields survive a little-endian write and parse unchanged.
    #[test]
    fn prop_frame_fields_round_trip(
        tag in 0u8..=15,
        class_id in any::<u16>(),
        instance in any::<u8>(),
        command_id in any::<u32>(),
        payload in any::<u64>(),
        address in any::<u64>(),
    ) {
        let frame = BinaryFrame { tag, class_id, instance, command_id, payload, address };
        let parsed = BinaryFrame::parse(&frame.to_bytes())?;
        prop_assert_eq!(parsed, frame);
    }

    /// Parsing arbitrary bytes never panics.
    #[test]
    fn prop_parse_never_panics(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = BinaryFrame::parse(&data);
    }

    /// Encoding the same request twice yields identical bytes on both links.
    #[test]
    fn prop_encoding_is_deterministic(descriptor in axis_numeric(), value in any::<i32>()) {
        let req = Request::write(&AXIS, descriptor, Value::Int(i64::from(value)));
        prop_assert_eq!(TextCodec.encode(&req)?, TextCodec.encode(&req)?);
        prop_assert_eq!(BinaryCodec.encode(&req)?, BinaryCodec.encode(&req)?);
    }

    /// A reply echoing the exact command string is matched, with the payload kept.
    #[test]
    fn prop_exact_echo_matches(descriptor in axis_numeric(), data in "[0-9]{1,6}") {
        let req = Request::read(&AXIS, descriptor).with_instance(Some(0));
        let command = TextCodec::command_string(&req)?;
        let reply = format!("[{command}|{data}]");
        match TextCodec.decode(&req, reply.as_bytes()) {
            Decoded::Matched(resp) => {
                prop_assert_eq!(resp.outcome, Outcome::Acknowledgment);
                prop_assert_eq!(resp.data, ReplyData::Text(data));
            }
            Decoded::Unmatched => prop_assert!(false, "exact echo of {} was dropped", command),
        }
    }

    /// A reply echoing any other command string is dropped.
    #[test]
    fn prop_foreign_echo_is_unmatched(
        descriptor in axis_numeric(),
        other in axis_numeric(),
        data in "[0-9]{1,6}",
    ) {
        prop_assume!(descriptor.name != other.name);
        let req = Request::read(&AXIS, descriptor);
        let reply = format!("[axis.{}?|{data}]", other.name);
        prop_assert_eq!(TextCodec.decode(&req, reply.as_bytes()), Decoded::Unmatched);
    }

    /// A binary reply only answers a request with the same class and command id.
    #[test]
    fn prop_binary_reply_matches_identity(command_id in any::<u32>(), payload in any::<u64>()) {
        let reg = TMC4671.find_by_name("reg");
        prop_assume!(reg.is_some());
        let Some(reg) = reg else { return Ok(()) };
        let req = Request::read_at(&TMC4671, reg, 0);
        let reply = BinaryFrame {
            tag: Outcome::ACKNOWLEDGMENT_TAG,
            class_id: TMC4671.class_id,
            instance: 0,
            command_id,
            payload,
            address: 0,
        };
        let decoded = BinaryCodec.decode(&req, &reply.to_bytes());
        prop_assert_eq!(matches!(decoded, Decoded::Matched(_)), command_id == reg.id);
    }

    /// Echoed request frames are recognised as such, not as acknowledgements.
    #[test]
    fn prop_echoed_request_keeps_operation(tag in 0u8..=4) {
        let power = AXIS.find_by_name("power");
        let Some(power) = power else { return Ok(()) };
        let req = Request::read(&AXIS, power);
        let frame = BinaryFrame {
            tag,
            class_id: AXIS.class_id,
            instance: 0,
            command_id: power.id,
            payload: 0,
            address: 0,
        };
        match BinaryCodec.decode(&req, &frame.to_bytes()) {
            Decoded::Matched(resp) => {
                let op = Operation::from_tag(tag);
                prop_assert_eq!(Some(resp.outcome), op.map(Outcome::EchoedRequest));
                prop_assert!(!resp.acknowledges(&req));
            }
            Decoded::Unmatched => prop_assert!(false, "frame with tag {} was dropped", tag),
        }
    }
}
