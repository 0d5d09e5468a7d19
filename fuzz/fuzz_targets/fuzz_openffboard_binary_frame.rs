//! Fuzzes the OpenFFBoard 25-byte binary frame parser.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_openffboard_binary_frame
#![no_main]
use libfuzzer_sys::fuzz_target;
use racing_wheel_hid_openffboard_protocol::{BinaryFrame, FRAME_LEN};

fuzz_target!(|data: &[u8]| {
    // Must never panic; anything that parses re-encodes to the same prefix.
    if let Ok(frame) = BinaryFrame::parse(data) {
        let bytes = frame.to_bytes();
        assert_eq!(Some(&bytes[..]), data.get(..FRAME_LEN));
        let _ = frame.outcome();
        let _ = frame.signed_payload();
    }
});
