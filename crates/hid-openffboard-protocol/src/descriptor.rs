//! Parameter descriptors and the per-class tables that group them.
//!
//! Tables are plain data built at compile time and never mutated, so they can
//! be shared between tasks without synchronisation.

use bitflags::bitflags;

use crate::error::{ProtocolError, ProtocolResult};
use crate::value::ValueKind;

bitflags! {
    /// Operations a parameter accepts.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u16 {
        /// Plain read (`name?`)
        const READABLE        = 0b0000_0001;
        /// Plain write (`name=value`)
        const WRITABLE        = 0b0000_0010;
        /// Read at an address (`name?addr`)
        const ADDRESSED_READ  = 0b0000_0100;
        /// Write at an address (`name=value?addr`)
        const ADDRESSED_WRITE = 0b0000_1000;
        /// Info query (`name!`)
        const HAS_INFO        = 0b0001_0000;
        /// Only answered while the board is in debug mode
        const REQUIRES_DEBUG  = 0b0010_0000;
        /// Payload is free text and cannot travel over the binary link
        const TEXTUAL         = 0b0100_0000;

        const READ_WRITE = Self::READABLE.bits() | Self::WRITABLE.bits();
    }
}

/// Immutable description of one device-side parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: &'static str,
    pub id: u32,
    pub capabilities: Capabilities,
    pub kind: ValueKind,
    pub description: &'static str,
}

impl ParameterDescriptor {
    pub const fn new(
        name: &'static str,
        id: u32,
        kind: ValueKind,
        capabilities: Capabilities,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            id,
            capabilities,
            kind,
            description,
        }
    }

    pub fn has(&self, capability: Capabilities) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn requires_debug(&self) -> bool {
        self.has(Capabilities::REQUIRES_DEBUG)
    }

    pub fn is_textual(&self) -> bool {
        self.has(Capabilities::TEXTUAL) || self.kind == ValueKind::Text
    }
}

/// A device subsystem: its 16-bit class id, its text path prefix and the
/// parameters it exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceClassTable {
    pub class_id: u16,
    pub prefix: &'static str,
    pub descriptors: &'static [ParameterDescriptor],
}

impl DeviceClassTable {
    pub const fn new(
        class_id: u16,
        prefix: &'static str,
        descriptors: &'static [ParameterDescriptor],
    ) -> Self {
        Self {
            class_id,
            prefix,
            descriptors,
        }
    }

    pub fn find_by_name(&self, name: &str) -> Option<&'static ParameterDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn find_by_id(&self, id: u32) -> Option<&'static ParameterDescriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    /// Name lookup that turns a miss into [`ProtocolError::UnknownParameter`].
    pub fn parameter(&self, name: &str) -> ProtocolResult<&'static ParameterDescriptor> {
        self.find_by_name(name)
            .ok_or_else(|| ProtocolError::UnknownParameter {
                class: self.prefix,
                name: name.to_string(),
            })
    }

    /// Check that names and ids are unique within the table.
    pub fn validate(&self) -> ProtocolResult<()> {
        for (index, descriptor) in self.descriptors.iter().enumerate() {
            let earlier = self.descriptors.iter().take(index);
            for other in earlier {
                if other.name == descriptor.name {
                    return Err(ProtocolError::DuplicateParameter {
                        class: self.prefix,
                        what: "name",
                        value: descriptor.name.to_string(),
                    });
                }
                if other.id == descriptor.id {
                    return Err(ProtocolError::DuplicateParameter {
                        class: self.prefix,
                        what: "id",
                        value: format!("{:#x}", descriptor.id),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static ParameterDescriptor> {
        self.descriptors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: Capabilities = Capabilities::READABLE;

    static PARAMS: [ParameterDescriptor; 2] = [
        ParameterDescriptor::new("power", 0x0, ValueKind::UInt, Capabilities::READ_WRITE, "Power"),
        ParameterDescriptor::new("pos", 0x9, ValueKind::Int, R, "Position"),
    ];
    static TABLE: DeviceClassTable = DeviceClassTable::new(0xA01, "axis", &PARAMS);

    static DUP_IDS: [ParameterDescriptor; 2] = [
        ParameterDescriptor::new("a", 0x1, ValueKind::Int, R, ""),
        ParameterDescriptor::new("b", 0x1, ValueKind::Int, R, ""),
    ];

    #[test]
    fn lookup_by_name_and_id() {
        assert_eq!(TABLE.find_by_name("pos").map(|d| d.id), Some(0x9));
        assert_eq!(TABLE.find_by_id(0x0).map(|d| d.name), Some("power"));
    }

    #[test]
    fn lookup_miss_is_explicit() {
        assert!(TABLE.find_by_name("nope").is_none());
        assert!(matches!(
            TABLE.parameter("nope"),
            Err(ProtocolError::UnknownParameter { class: "axis", .. })
        ));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let table = DeviceClassTable::new(0x1, "dup", &DUP_IDS);
        assert!(matches!(
            table.validate(),
            Err(ProtocolError::DuplicateParameter { what: "id", .. })
        ));
        assert!(TABLE.validate().is_ok());
    }

    #[test]
    fn read_write_contains_both() {
        assert!(PARAMS[0].has(Capabilities::READABLE));
        assert!(PARAMS[0].has(Capabilities::WRITABLE));
        assert!(!PARAMS[1].has(Capabilities::WRITABLE));
    }
}
