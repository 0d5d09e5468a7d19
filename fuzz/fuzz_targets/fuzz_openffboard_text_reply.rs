//! Fuzzes the OpenFFBoard text reply decoder against every built-in parameter.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_openffboard_text_reply
#![no_main]
use libfuzzer_sys::fuzz_target;
use racing_wheel_hid_openffboard_protocol::{
    Decoded, Request, TextCodec, ValueKind, builtin_tables,
};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let tables = builtin_tables();
    let table = tables[usize::from(selector) % tables.len()];
    let count = table.iter().count();
    let Some(descriptor) = table.iter().nth(usize::from(selector >> 2) % count.max(1)) else {
        return;
    };

    let reply = String::from_utf8_lossy(rest);
    let request = Request::read(table, descriptor).with_instance(Some(selector & 3));
    // Must never panic, and a match must always belong to the request.
    if let Decoded::Matched(response) = TextCodec::decode_reply(&request, &reply) {
        assert_eq!(response.command_id, descriptor.id);
        let _ = response.value(descriptor.kind);
        let _ = response.value(ValueKind::Text);
    }
});
