//! Async OpenFFBoard command client.
//!
//! Builds on the I/O-free codecs of `racing-wheel-hid-openffboard-protocol`:
//!
//! - [`link`]: physical links (CDC serial, vendor HID, in-memory mock);
//! - [`TransportSession`]: owns one link and runs one exchange at a time,
//!   with a reply timeout and disconnect-on-IO-failure;
//! - [`CommandInvoker`]: typed get/set/info with capability checks and the
//!   debug-mode precondition;
//! - [`ClientConfig`]: JSON configuration selecting the link and policies.
//!
//! Device subsystems are data: each is a
//! [`DeviceClassTable`](protocol::DeviceClassTable), reached by name through
//! [`CommandInvoker::class`].

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod facade;
pub mod invoker;
pub mod link;
pub mod session;

pub use racing_wheel_hid_openffboard_protocol as protocol;

pub use config::{ClientConfig, LinkConfig};
pub use error::{
    CommandError, CommandResult, ConfigError, TransportError, TransportResult,
};
pub use facade::ClassHandle;
pub use invoker::{CommandInvoker, ErrorPolicy, InstancePolicy, InvokerConfig};
pub use link::{Connector, Link, LinkKind};
pub use session::{DEFAULT_TIMEOUT, Gated, SessionConfig, TransportSession};
