//! Typed, capability-checked parameter access over a transport session.
//!
//! The invoker checks what a descriptor allows before anything reaches the
//! wire, runs the debug-mode check for debug-gated parameters, and turns
//! replies into Rust values. How device refusals (`Error`, `NotFound`)
//! surface is governed by [`ErrorPolicy`]; any other non-acknowledging
//! outcome on a read is always a [`CommandError::Device`].

use std::sync::Arc;

use racing_wheel_hid_openffboard_protocol::{
    Capabilities, DeviceClassTable, FromValue, IntoValue, Operation, Outcome,
    ParameterDescriptor, Request, Response, SYSTEM, ValueKind, debug_flag,
};
use serde::{Deserialize, Serialize};

use crate::error::{CommandError, CommandResult};
use crate::facade::ClassHandle;
use crate::session::{Gated, TransportSession};

/// What a device refusal (`Error` or `NotFound`) turns into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Reads resolve to the type's default value, writes to `false`.
    #[default]
    DefaultOnError,
    /// Refusals are returned as [`CommandError::Device`].
    Strict,
}

/// Instance addressing for writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstancePolicy {
    /// Writes go to the instance the caller names.
    #[default]
    PassThrough,
    /// Writes always target instance 0, whatever the caller names. Matches
    /// older host tools.
    PinWritesToZero,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokerConfig {
    #[serde(default)]
    pub error_policy: ErrorPolicy,
    #[serde(default)]
    pub instance_policy: InstancePolicy,
}

const DEBUG_DISABLED: &str = "debug mode is disabled on the device";

#[derive(Debug, Clone)]
pub struct CommandInvoker {
    session: Arc<TransportSession>,
    config: InvokerConfig,
}

impl CommandInvoker {
    pub fn new(session: Arc<TransportSession>) -> Self {
        Self::with_config(session, InvokerConfig::default())
    }

    pub fn with_config(session: Arc<TransportSession>, config: InvokerConfig) -> Self {
        Self { session, config }
    }

    pub fn session(&self) -> &Arc<TransportSession> {
        &self.session
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Name-based access to one class table.
    pub fn class(&self, table: &'static DeviceClassTable) -> ClassHandle<'_> {
        ClassHandle::new(self, table)
    }

    /// Read a parameter.
    pub async fn get<T: FromValue>(
        &self,
        class: &DeviceClassTable,
        instance: Option<u8>,
        descriptor: &ParameterDescriptor,
    ) -> CommandResult<T> {
        let request = Request::read(class, descriptor).with_instance(instance);
        self.read(request).await
    }

    /// Read a parameter at `address`.
    pub async fn get_addressed<T: FromValue>(
        &self,
        class: &DeviceClassTable,
        instance: Option<u8>,
        descriptor: &ParameterDescriptor,
        address: u64,
    ) -> CommandResult<T> {
        let request = Request::read_at(class, descriptor, address).with_instance(instance);
        self.read(request).await
    }

    /// Write a parameter. `Ok(true)` only when the device acknowledged this
    /// exact command.
    pub async fn set<T: IntoValue>(
        &self,
        class: &DeviceClassTable,
        instance: Option<u8>,
        descriptor: &ParameterDescriptor,
        value: T,
    ) -> CommandResult<bool> {
        let request = Request::write(class, descriptor, value.into_value())
            .with_instance(self.write_instance(instance));
        self.write(request).await
    }

    /// Write a parameter at `address`.
    pub async fn set_addressed<T: IntoValue>(
        &self,
        class: &DeviceClassTable,
        instance: Option<u8>,
        descriptor: &ParameterDescriptor,
        value: T,
        address: u64,
    ) -> CommandResult<bool> {
        let request = Request::write_at(class, descriptor, value.into_value(), address)
            .with_instance(self.write_instance(instance));
        self.write(request).await
    }

    /// Query the device's description of a parameter. Text link only.
    pub async fn get_info(
        &self,
        class: &DeviceClassTable,
        instance: Option<u8>,
        descriptor: &ParameterDescriptor,
    ) -> CommandResult<String> {
        let request = Request::info(class, descriptor).with_instance(instance);
        let response = self.dispatch(&request).await?;
        match response.outcome {
            Outcome::Acknowledgment => Ok(response.data_text()),
            outcome if outcome.is_rejection() => self.refused(&request, &response),
            _ => Err(no_value(&request, &response)),
        }
    }

    async fn read<T: FromValue>(&self, request: Request<'_>) -> CommandResult<T> {
        let response = self.dispatch(&request).await?;
        match response.outcome {
            Outcome::Acknowledgment => {}
            outcome if outcome.is_rejection() => return self.refused(&request, &response),
            _ => return Err(no_value(&request, &response)),
        }
        let name = request.descriptor.name;
        let value = response
            .value(request.descriptor.kind)
            .map_err(|source| CommandError::Coercion { name, source })?;
        T::from_value(value).map_err(|source| CommandError::Coercion { name, source })
    }

    async fn write(&self, request: Request<'_>) -> CommandResult<bool> {
        let response = self.dispatch(&request).await?;
        if response.acknowledges(&request) {
            return Ok(true);
        }
        if response.outcome.is_rejection() {
            return self.refused(&request, &response).map(|()| false);
        }
        tracing::debug!(
            param = request.descriptor.name,
            outcome = ?response.outcome,
            "write not acknowledged"
        );
        Ok(false)
    }

    /// Capability, link and debug checks, then the exchange itself.
    async fn dispatch(&self, request: &Request<'_>) -> CommandResult<Response> {
        let descriptor = request.descriptor;
        check_capability(descriptor, request.operation)?;

        let codec = self.session.codec();
        if !codec.carries_text()
            && (descriptor.is_textual() || request.operation == Operation::Info)
        {
            return Err(CommandError::UnsupportedOnLink {
                name: descriptor.name,
                link: codec.link_name(),
            });
        }

        if !descriptor.requires_debug() {
            return Ok(self.session.exchange(request).await?);
        }

        let precheck = Request::read(&SYSTEM, debug_flag());
        match self
            .session
            .exchange_gated(&precheck, debug_enabled, request)
            .await?
        {
            Gated::Proceeded(response) => Ok(response),
            Gated::Refused(_) => Err(CommandError::Precondition {
                name: descriptor.name,
                reason: DEBUG_DISABLED,
            }),
        }
    }

    /// Apply the error policy to a reply that carries no usable value.
    fn refused<T: Default>(&self, request: &Request<'_>, response: &Response) -> CommandResult<T> {
        match self.config.error_policy {
            ErrorPolicy::DefaultOnError => {
                tracing::debug!(
                    param = request.descriptor.name,
                    outcome = ?response.outcome,
                    "device refused command, using default value"
                );
                Ok(T::default())
            }
            ErrorPolicy::Strict => Err(CommandError::Device {
                name: request.descriptor.name,
                outcome: response.outcome,
                detail: response.data_text(),
            }),
        }
    }

    fn write_instance(&self, requested: Option<u8>) -> Option<u8> {
        match self.config.instance_policy {
            InstancePolicy::PassThrough => requested,
            InstancePolicy::PinWritesToZero => Some(0),
        }
    }
}

/// A matched reply that neither acknowledges nor refuses (a notification or
/// an echoed request) carries no value for a read, whatever the policy.
fn no_value(request: &Request<'_>, response: &Response) -> CommandError {
    CommandError::Device {
        name: request.descriptor.name,
        outcome: response.outcome,
        detail: response.data_text(),
    }
}

fn check_capability(descriptor: &ParameterDescriptor, operation: Operation) -> CommandResult<()> {
    let needed = match operation {
        Operation::Read => Capabilities::READABLE,
        Operation::ReadAddressed => Capabilities::ADDRESSED_READ,
        Operation::Write => Capabilities::WRITABLE,
        Operation::WriteAddressed => Capabilities::ADDRESSED_WRITE,
        Operation::Info => Capabilities::HAS_INFO,
    };
    if descriptor.has(needed) {
        Ok(())
    } else {
        Err(CommandError::Capability {
            name: descriptor.name,
            operation,
        })
    }
}

fn debug_enabled(reply: &Response) -> bool {
    reply.outcome == Outcome::Acknowledgment
        && reply
            .value(ValueKind::Bool)
            .ok()
            .and_then(|value| bool::from_value(value).ok())
            .unwrap_or(false)
}
