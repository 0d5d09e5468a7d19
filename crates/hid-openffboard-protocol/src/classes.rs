//! Built-in class tables for the board subsystems the client talks to.
//!
//! Each table mirrors the command list the firmware prints for the class.
//! Subsystem facades are expected to be generated over these tables.

use crate::descriptor::{Capabilities, DeviceClassTable, ParameterDescriptor};
use crate::value::ValueKind::{Bool, Float, Int, Text, UInt};

const R: Capabilities = Capabilities::READABLE;
const W: Capabilities = Capabilities::WRITABLE;
const RW: Capabilities = Capabilities::READ_WRITE;
const RW_INFO: Capabilities = Capabilities::READ_WRITE.union(Capabilities::HAS_INFO);
const RW_DEBUG: Capabilities = Capabilities::READ_WRITE.union(Capabilities::REQUIRES_DEBUG);
const R_TEXT: Capabilities = Capabilities::READABLE.union(Capabilities::TEXTUAL);
const R_INFO_TEXT: Capabilities = R_TEXT.union(Capabilities::HAS_INFO);

/// Id of the system class `debug` flag that gates debug-only parameters.
pub const DEBUG_FLAG_ID: u32 = 0x13;

/// Reply left segment the firmware uses for unsolicited error reports.
pub const SYSTEM_ERROR_SENTINEL: &str = "sys.0.errors?";

const fn p(
    name: &'static str,
    id: u32,
    kind: crate::value::ValueKind,
    capabilities: Capabilities,
    description: &'static str,
) -> ParameterDescriptor {
    ParameterDescriptor::new(name, id, kind, capabilities, description)
}

macro_rules! handler_params {
    () => {
        [
            p("id", 0x8000_0001, Int, R, "ID of class"),
            p("name", 0x8000_0002, Text, R_TEXT, "name of class"),
            p("help", 0x8000_0003, Text, R_INFO_TEXT, "Prints help for commands"),
            p("instance", 0x8000_0004, Int, R, "Command handler instance number"),
            p("cmduid", 0x8000_0005, Int, R, "Command handler index"),
        ]
    };
}

// The handler `help` (0x80000003) is left out: its name collides with the
// system `help` command at 0x0.
static SYSTEM_PARAMS: [ParameterDescriptor; 23] = [
    p("help", 0x0, Text, R_TEXT, "Print system help"),
    p("save", 0x1, Bool, R, "Write all settings to flash"),
    p("reboot", 0x2, Bool, R, "Reset chip"),
    p("dfu", 0x3, Bool, R, "reboot into DFU bootloader"),
    p("swver", 0x4, Text, R_TEXT, "Firmware version"),
    p("hwtype", 0x5, Text, R_TEXT, "Hardware type"),
    p("lsmain", 0x6, Text, R_TEXT, "List available mainclasses"),
    p("main", 0x7, UInt, RW, "Query or change mainclass"),
    p("lsactive", 0x8, Text, R_TEXT, "List active classes (Fullname:clsname:inst:clsid:idx)"),
    p("format", 0x9, Bool, W, "set format=1 to erase all stored values"),
    p("errors", 0xA, Text, R_TEXT, "Read error states"),
    p("errorsclr", 0xB, Bool, R, "Reset errors"),
    p("flashdump", 0xC, Text, R_TEXT, "Read all flash variables (val:adr)"),
    p("flashraw", 0xD, UInt, Capabilities::ADDRESSED_WRITE, "Write value to flash address"),
    p("vint", 0xE, UInt, R, "Internal voltage(mV)"),
    p("vext", 0xF, UInt, R, "External voltage(mV)"),
    p("heapfree", 0x11, Text, R_TEXT, "Memory info"),
    p("debug", DEBUG_FLAG_ID, Bool, RW, "Enable or disable debug commands"),
    p("devid", 0x14, Text, R_TEXT, "Get chip dev id and rev id"),
    p("id", 0x8000_0001, Int, R, "ID of class"),
    p("name", 0x8000_0002, Text, R_TEXT, "name of class"),
    p("instance", 0x8000_0004, Int, R, "Command handler instance number"),
    p("cmduid", 0x8000_0005, Int, R, "Command handler index"),
];

/// System class: firmware, flash, error and debug-mode control.
pub static SYSTEM: DeviceClassTable = DeviceClassTable::new(0x0, "sys", &SYSTEM_PARAMS);

static AXIS_PARAMS: [ParameterDescriptor; 20] = {
    let [id, name, help, instance, cmduid] = handler_params!();
    [
        id,
        name,
        help,
        instance,
        cmduid,
        p("power", 0x0, UInt, RW, "Overall force strength"),
        p("degrees", 0x1, UInt, RW, "Rotation range in deg"),
        p("esgain", 0x2, UInt, RW, "Endstop stiffness"),
        p("zeroenc", 0x3, Bool, R, "Zero axis"),
        p("invert", 0x4, Bool, RW, "Invert axis"),
        p("idlespring", 0x5, UInt, RW, "Idle spring strength"),
        p("axisdamper", 0x6, UInt, RW, "Independent damper effect"),
        p("enctype", 0x7, Text, RW_INFO.union(Capabilities::TEXTUAL), "Encoder type get/set/list"),
        p("drvtype", 0x8, Text, RW_INFO.union(Capabilities::TEXTUAL), "Motor driver type get/set/list"),
        p("pos", 0x9, Int, R, "Encoder position"),
        p("maxspeed", 0xA, Int, RW, "Speed limit in deg/s"),
        p("maxtorquerate", 0xB, Int, RW, "Torque rate limit in counts/ms"),
        p("fxratio", 0xC, UInt, RW, "Effect ratio. Reduces effects excluding endstop. 255=100%"),
        p("curtorque", 0xD, Int, R, "Axis torque"),
        p("curpos", 0xE, Int, R, "Axis position"),
    ]
};

/// FFB axis class.
pub static AXIS: DeviceClassTable = DeviceClassTable::new(0xA01, "axis", &AXIS_PARAMS);

static FX_PARAMS: [ParameterDescriptor; 12] = {
    let [id, name, help, instance, cmduid] = handler_params!();
    [
        id,
        name,
        help,
        instance,
        cmduid,
        p("filterCfFreq", 0x0, UInt, RW, "Constant force filter frequency"),
        p("filterCfQ", 0x1, UInt, RW, "Constant force filter Q-factor"),
        p("effects", 0x2, Text, RW.union(Capabilities::TEXTUAL), "List effects. set 0 to reset"),
        p("spring", 0x3, UInt, RW_INFO, "Spring gain"),
        p("friction", 0x4, UInt, RW_INFO, "Friction gain"),
        p("damper", 0x5, UInt, RW_INFO, "Damper gain"),
        p("inertia", 0x6, UInt, RW_INFO, "Inertia gain"),
    ]
};

/// Effects manager class.
pub static FX: DeviceClassTable = DeviceClassTable::new(0xA02, "fx", &FX_PARAMS);

static TMC4671_PARAMS: [ParameterDescriptor; 41] = {
    let [id, name, help, instance, cmduid] = handler_params!();
    [
        id,
        name,
        help,
        instance,
        cmduid,
        p("cpr", 0x0, UInt, RW, "CPR in TMC"),
        p("mtype", 0x1, UInt, RW_INFO, "Motor type"),
        p("encsrc", 0x2, UInt, RW_INFO, "Encoder source"),
        p("tmcHwType", 0x3, UInt, RW_INFO, "Version of TMC board"),
        p("encalign", 0x4, Bool, R, "Align encoder"),
        p("poles", 0x5, UInt, RW, "Motor pole pairs"),
        p("acttrq", 0x6, Text, R_TEXT, "Measure torque and flux"),
        p("pwmlim", 0x7, UInt, RW_DEBUG, "PWM limit"),
        p("torqueP", 0x8, UInt, RW, "Torque P"),
        p("torqueI", 0x9, UInt, RW, "Torque I"),
        p("fluxP", 0xA, UInt, RW, "Flux P"),
        p("fluxI", 0xB, UInt, RW, "Flux I"),
        p("velocityP", 0xC, UInt, RW, "Velocity P"),
        p("velocityI", 0xD, UInt, RW, "Velocity I"),
        p("posP", 0xE, UInt, RW, "Pos P"),
        p("posI", 0xF, UInt, RW, "Pos I"),
        p("tmctype", 0x10, Text, R_TEXT, "Version of TMC chip"),
        p("pidPrec", 0x11, Text, RW.union(Capabilities::TEXTUAL), "PID precision bit0=I bit1=P. 0=Q8.8 1= Q4.12"),
        p("phiesrc", 0x12, Text, RW_DEBUG.union(Capabilities::TEXTUAL), "PhiE source"),
        p("fluxoffset", 0x13, UInt, RW, "Offset flux scale for field weakening"),
        p("seqpi", 0x14, Bool, RW, "Sequential PI"),
        p("iScale", 0x15, Text, R_TEXT, "Counts per A"),
        p("encdir", 0x16, UInt, RW_DEBUG, "Encoder dir"),
        p("temp", 0x17, Float, R, "Temperature in C"),
        p(
            "reg",
            0x18,
            UInt,
            Capabilities::ADDRESSED_READ
                .union(Capabilities::ADDRESSED_WRITE)
                .union(Capabilities::REQUIRES_DEBUG),
            "Read or write a TMC register at adr",
        ),
        p("svpwm", 0x19, Text, RW.union(Capabilities::TEXTUAL), "Space-vector PWM"),
        p("calibrate", 0x1A, Bool, R, "Full calibration"),
        p("calibrated", 0x1B, Bool, R, "Calibration valid"),
        p("abnindex", 0x1C, Bool, RW, "Enable ABN index"),
        p("autohome", 0x1D, Bool, R, "Find abn index"),
        p("state", 0x1E, UInt, R, "Get state"),
        p("abnpol", 0x1F, UInt, RW, "Encoder polarity"),
        p("combineEncoder", 0x20, Bool, RW, "Use TMC for movement. External encoder for position"),
        p("invertForce", 0x21, Bool, RW, "Invert incoming forces"),
        p("vm", 0x22, UInt, R, "VM in mV"),
        p("extphie", 0x23, Bool, R, "external phie"),
    ]
};

/// TMC4671 motor driver class.
pub static TMC4671: DeviceClassTable = DeviceClassTable::new(0x81, "tmc", &TMC4671_PARAMS);

/// All built-in tables, in class-id order.
pub fn builtin_tables() -> [&'static DeviceClassTable; 4] {
    [&SYSTEM, &TMC4671, &AXIS, &FX]
}

pub fn find_table(prefix: &str) -> Option<&'static DeviceClassTable> {
    builtin_tables().into_iter().find(|t| t.prefix == prefix)
}

pub fn find_table_by_id(class_id: u16) -> Option<&'static DeviceClassTable> {
    builtin_tables().into_iter().find(|t| t.class_id == class_id)
}

/// The system `debug` flag descriptor.
pub fn debug_flag() -> &'static ParameterDescriptor {
    &SYSTEM_PARAMS[17]
}
