//! Terminal nodes: types, registers, memory addresses, labels.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::arena::Id;

/// A type: a name, a storage width, and the component types of an
/// aggregate (empty for primitives).
///
/// `width` stays zero until a type-resolution pass fills it in; the
/// relation between an aggregate's width and its components' widths is
/// that pass's business, not the model's.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeIdentifier {
    pub name: String,
    pub width: u64,
    pub components: Vec<Id<TypeIdentifier>>,
}

impl TypeIdentifier {
    pub(crate) fn new(name: String, width: u64, components: Vec<Id<TypeIdentifier>>) -> Self {
        Self {
            name,
            width,
            components,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.components.is_empty()
    }

    pub fn is_resolved(&self) -> bool {
        self.width != 0
    }
}

/// A named machine register. Two registers with the same name are the same
/// physical location, so equality is by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CpuRegister {
    pub name: String,
}

impl fmt::Display for CpuRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.name)
    }
}

/// A resolved storage location in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemoryAddress {
    pub location: u64,
}

impl fmt::Display for MemoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}]", self.location)
    }
}

/// A named jump target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
