//! Snapshot tests pinning the exact wire form of representative commands.

use insta::assert_snapshot;
use racing_wheel_hid_openffboard_protocol::{
    AXIS, BinaryCodec, FX, OPENFFBOARD_PRODUCT_ID, OPENFFBOARD_VENDOR_ID, Request, SYSTEM,
    TMC4671, TextCodec, Value, WireCodec,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn text(req: &Request<'_>) -> Result<String, Box<dyn std::error::Error>> {
    Ok(TextCodec::command_string(req)?)
}

fn hex(req: &Request<'_>) -> Result<String, Box<dyn std::error::Error>> {
    let bytes = BinaryCodec.encode(req)?;
    Ok(bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" "))
}

#[test]
fn snapshot_ids() {
    assert_snapshot!(
        format!("{OPENFFBOARD_VENDOR_ID:#06X}:{OPENFFBOARD_PRODUCT_ID:#06X}"),
        @"0x1209:0xFFB0"
    );
}

// -- Text link ----------------------------------------------------------------

#[test]
fn snapshot_text_read() -> TestResult {
    let req = Request::read(&AXIS, AXIS.parameter("degrees")?);
    assert_snapshot!(text(&req)?, @"axis.degrees?");
    Ok(())
}

#[test]
fn snapshot_text_write_instance() -> TestResult {
    let req = Request::write(&AXIS, AXIS.parameter("power")?, Value::UInt(500))
        .with_instance(Some(0));
    assert_snapshot!(text(&req)?, @"axis.0.power=500");
    Ok(())
}

#[test]
fn snapshot_text_addressed() -> TestResult {
    let reg = TMC4671.parameter("reg")?;
    assert_snapshot!(text(&Request::read_at(&TMC4671, reg, 3))?, @"tmc.reg?3");
    assert_snapshot!(
        text(&Request::write_at(&TMC4671, reg, Value::UInt(255), 9).with_instance(Some(1)))?,
        @"tmc.1.reg=255?9"
    );
    Ok(())
}

#[test]
fn snapshot_text_info_and_bool() -> TestResult {
    let spring = FX.parameter("spring")?;
    assert_snapshot!(text(&Request::info(&FX, spring))?, @"fx.spring!");
    let debug = SYSTEM.parameter("debug")?;
    assert_snapshot!(text(&Request::write(&SYSTEM, debug, Value::Bool(false)))?, @"sys.debug=0");
    Ok(())
}

// -- Binary link --------------------------------------------------------------

#[test]
fn snapshot_binary_power_write() -> TestResult {
    let req = Request::write(&AXIS, AXIS.parameter("power")?, Value::UInt(500))
        .with_instance(Some(0));
    assert_snapshot!(
        hex(&req)?,
        @"A1 00 01 0A 00 00 00 00 00 F4 01 00 00 00 00 00 00 00 00 00 00 00 00 00 00"
    );
    Ok(())
}

#[test]
fn snapshot_binary_addressed_read() -> TestResult {
    let req = Request::read_at(&TMC4671, TMC4671.parameter("reg")?, 0x1F);
    assert_snapshot!(
        hex(&req)?,
        @"A1 04 81 00 00 18 00 00 00 00 00 00 00 00 00 00 00 1F 00 00 00 00 00 00 00"
    );
    Ok(())
}

#[test]
fn snapshot_binary_negative_write() -> TestResult {
    let req = Request::write(&AXIS, AXIS.parameter("maxspeed")?, Value::Int(-1));
    assert_snapshot!(
        hex(&req)?,
        @"A1 00 01 0A 00 0A 00 00 00 FF FF FF FF FF FF FF FF 00 00 00 00 00 00 00 00"
    );
    Ok(())
}
