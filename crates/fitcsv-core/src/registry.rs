//! Message layouts learned from definition records.
//!
//! Data records do not describe themselves; they name a 4-bit local type id
//! and rely on the most recent definition record for that id. The
//! [`TypeRegistry`] holds those definitions for the lifetime of one decode.

use std::fmt;

use serde::Serialize;

/// Number of local type slots (ids are 4 bits wide).
pub const LOCAL_TYPE_SLOTS: usize = 16;

/// Global message number of the activity-sample ("record") message.
pub const MESG_RECORD: u16 = 20;

/// One declared field inside a message layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    /// Field definition number; its meaning depends on the message.
    pub number: u8,
    /// Bytes the field occupies in every data record of this layout.
    pub size: u8,
    /// Base type code selecting how the bytes are interpreted.
    pub base_type: u8,
}

impl FieldSpec {
    pub fn new(number: u8, size: u8, base_type: u8) -> Self {
        Self {
            number,
            size,
            base_type,
        }
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {}]", self.number, self.size, self.base_type)
    }
}

/// A learned message layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageDefinition {
    /// Global message number (what kind of message this is).
    pub global: u16,
    /// Local type id data records use to reference this layout.
    pub local_type: u8,
    /// Architecture byte from the definition record (0 = little-endian).
    pub architecture: u8,
    /// Fields in wire order.
    pub fields: Vec<FieldSpec>,
}

impl MessageDefinition {
    /// Total bytes of a data record body using this layout.
    pub fn data_size(&self) -> usize {
        self.fields.iter().map(|f| f.size as usize).sum()
    }

    pub fn is_sample(&self) -> bool {
        self.global == MESG_RECORD
    }
}

/// Local type id → most recently defined layout.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    slots: [Option<MessageDefinition>; LOCAL_TYPE_SLOTS],
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `definition` under its local type id, returning the layout it
    /// replaces. A later definition for the same id always wins.
    pub fn define(&mut self, definition: MessageDefinition) -> Option<MessageDefinition> {
        let slot = slot_index(definition.local_type);
        self.slots[slot].replace(definition)
    }

    /// Layout currently registered for `local_type`, if any.
    pub fn lookup(&self, local_type: u8) -> Option<&MessageDefinition> {
        self.slots[slot_index(local_type)].as_ref()
    }

    /// Registered layouts in local type order.
    pub fn iter(&self) -> impl Iterator<Item = &MessageDefinition> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn slot_index(local_type: u8) -> usize {
    (local_type & 0x0F) as usize
}
