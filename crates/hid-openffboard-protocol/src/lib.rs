//! OpenFFBoard command protocol: parameter tables and wire codecs.
//!
//! OpenFFBoard is an open-source direct-drive wheel controller from
//! <https://github.com/Ultrawipf/OpenFFBoard>. Besides the standard HID PID
//! force reports it exposes a command layer that reads and writes named
//! parameters of its subsystems ("classes"). The same commands travel over
//! two links:
//!
//! - the CDC serial port, as ASCII lines (`axis.0.power=500` answered by
//!   `[axis.0.power=500|OK]`), see [`text`];
//! - a vendor HID report, as fixed 25-byte frames, see [`binary`].
//!
//! This crate is I/O-free. It describes parameters ([`ParameterDescriptor`],
//! [`DeviceClassTable`]), builds [`Request`]s, encodes them and correlates
//! replies into [`Response`]s. Transport and typed access live in
//! `racing-wheel-openffboard-client`.
//!
//! # VID / PID
//! - Vendor ID: 0x1209 (pid.codes open hardware)
//! - Product IDs: 0xFFB0 (main firmware), 0xFFB1 (alternate)
//!
//! # Sources
//! - <https://github.com/Ultrawipf/OpenFFBoard>
//! - OpenFFBoard wiki: commands and HID command interface

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod binary;
pub mod classes;
pub mod codec;
pub mod command;
pub mod descriptor;
pub mod error;
pub mod ids;
pub mod text;
pub mod value;

pub use binary::{BinaryCodec, BinaryFrame, FRAME_LEN, FRAME_MAGIC};
pub use classes::{
    AXIS, DEBUG_FLAG_ID, FX, SYSTEM, SYSTEM_ERROR_SENTINEL, TMC4671, builtin_tables, debug_flag,
    find_table, find_table_by_id,
};
pub use codec::WireCodec;
pub use command::{Decoded, Operation, Outcome, ReplyData, Request, Response};
pub use descriptor::{Capabilities, DeviceClassTable, ParameterDescriptor};
pub use error::{ProtocolError, ProtocolResult};
pub use ids::{
    DEFAULT_SERIAL_BAUD_RATE, OPENFFBOARD_PRODUCT_ID, OPENFFBOARD_PRODUCT_ID_ALT,
    OPENFFBOARD_VENDOR_ID, is_openffboard_device, is_openffboard_product,
};
pub use text::{COMMAND_TERMINATOR, REPLY_TERMINATOR, TextCodec};
pub use value::{FromValue, IntoValue, Value, ValueKind};
