//! Requests, replies and their classification.

use serde::{Deserialize, Serialize};

use crate::descriptor::{DeviceClassTable, ParameterDescriptor};
use crate::error::ProtocolResult;
use crate::value::{Value, ValueKind};

/// Operation requested of a parameter.
///
/// The discriminants are the operation tags of the binary frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Operation {
    Write = 0,
    Read = 1,
    Info = 2,
    WriteAddressed = 3,
    ReadAddressed = 4,
}

impl Operation {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Write),
            1 => Some(Self::Read),
            2 => Some(Self::Info),
            3 => Some(Self::WriteAddressed),
            4 => Some(Self::ReadAddressed),
            _ => None,
        }
    }

    pub fn is_write(self) -> bool {
        matches!(self, Self::Write | Self::WriteAddressed)
    }

    pub fn is_addressed(self) -> bool {
        matches!(self, Self::WriteAddressed | Self::ReadAddressed)
    }
}

/// Classification of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Acknowledgment,
    Error,
    NotFound,
    Notification,
    /// The device echoed a request frame back unchanged.
    EchoedRequest(Operation),
}

impl Outcome {
    pub const ACKNOWLEDGMENT_TAG: u8 = 10;
    pub const NOT_FOUND_TAG: u8 = 13;
    pub const NOTIFICATION_TAG: u8 = 14;
    pub const ERROR_TAG: u8 = 15;

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            Self::ACKNOWLEDGMENT_TAG => Some(Self::Acknowledgment),
            Self::NOT_FOUND_TAG => Some(Self::NotFound),
            Self::NOTIFICATION_TAG => Some(Self::Notification),
            Self::ERROR_TAG => Some(Self::Error),
            other => Operation::from_tag(other).map(Self::EchoedRequest),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            Self::Acknowledgment => Self::ACKNOWLEDGMENT_TAG,
            Self::NotFound => Self::NOT_FOUND_TAG,
            Self::Notification => Self::NOTIFICATION_TAG,
            Self::Error => Self::ERROR_TAG,
            Self::EchoedRequest(op) => op.tag(),
        }
    }

    /// `true` for the outcomes a device uses to refuse a command.
    pub fn is_rejection(self) -> bool {
        matches!(self, Self::Error | Self::NotFound)
    }
}

/// One command addressed at a parameter of a device class.
#[derive(Debug, Clone, PartialEq)]
pub struct Request<'a> {
    pub class: &'a DeviceClassTable,
    pub instance: Option<u8>,
    pub descriptor: &'a ParameterDescriptor,
    pub operation: Operation,
    pub payload: Option<Value>,
    pub address: Option<u64>,
}

impl<'a> Request<'a> {
    pub fn read(class: &'a DeviceClassTable, descriptor: &'a ParameterDescriptor) -> Self {
        Self {
            class,
            instance: None,
            descriptor,
            operation: Operation::Read,
            payload: None,
            address: None,
        }
    }

    pub fn read_at(
        class: &'a DeviceClassTable,
        descriptor: &'a ParameterDescriptor,
        address: u64,
    ) -> Self {
        Self {
            operation: Operation::ReadAddressed,
            address: Some(address),
            ..Self::read(class, descriptor)
        }
    }

    pub fn write(
        class: &'a DeviceClassTable,
        descriptor: &'a ParameterDescriptor,
        value: Value,
    ) -> Self {
        Self {
            operation: Operation::Write,
            payload: Some(value),
            ..Self::read(class, descriptor)
        }
    }

    pub fn write_at(
        class: &'a DeviceClassTable,
        descriptor: &'a ParameterDescriptor,
        value: Value,
        address: u64,
    ) -> Self {
        Self {
            operation: Operation::WriteAddressed,
            payload: Some(value),
            address: Some(address),
            ..Self::read(class, descriptor)
        }
    }

    pub fn info(class: &'a DeviceClassTable, descriptor: &'a ParameterDescriptor) -> Self {
        Self {
            operation: Operation::Info,
            ..Self::read(class, descriptor)
        }
    }

    pub fn with_instance(mut self, instance: Option<u8>) -> Self {
        self.instance = instance;
        self
    }
}

/// Raw reply data as carried by the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyData {
    Text(String),
    Wire(i64),
}

/// A reply correlated with the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub outcome: Outcome,
    pub class_id: u16,
    pub instance: u8,
    pub command_id: u32,
    pub data: ReplyData,
    pub address: u64,
}

impl Response {
    /// `true` when the reply acknowledges `request` for the same class and
    /// parameter.
    pub fn acknowledges(&self, request: &Request<'_>) -> bool {
        self.outcome == Outcome::Acknowledgment
            && self.class_id == request.class.class_id
            && self.command_id == request.descriptor.id
    }

    /// Coerce the reply data into the kind the parameter declares.
    pub fn value(&self, kind: ValueKind) -> ProtocolResult<Value> {
        match &self.data {
            ReplyData::Text(raw) => Value::from_text(raw, kind),
            ReplyData::Wire(raw) => Ok(Value::from_wire(*raw, kind)),
        }
    }

    pub fn data_text(&self) -> String {
        match &self.data {
            ReplyData::Text(s) => s.clone(),
            ReplyData::Wire(v) => v.to_string(),
        }
    }
}

/// Result of offering a frame to a codec for a pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Matched(Response),
    /// The frame belongs to something else and must be dropped.
    Unmatched,
}
