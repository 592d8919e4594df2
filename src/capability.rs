//! Capability traits: what a node may be used as.
//!
//! A node kind opts in to a role by implementing one of the marker traits
//! below. Structural nodes that need "some value" or "some assignment
//! target" store a capability reference (`ValueRef`, `AssignableRef`, ...)
//! which can only be built from an `Id<T>` whose `T` carries the trait, so
//! a `Label` can never end up on the right-hand side of an assignment.
//!
//! For code that only holds an erased `NodeId`, the same information is
//! available at runtime through [`NodeKind::capabilities`](crate::node::NodeKind::capabilities).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::arena::{Id, NodeId};
use crate::node::Variant;

/// A storage location: a register or a memory address.
pub trait Addressable: Variant {}

/// Produces a value when read.
pub trait HasValue: Variant {}

/// May appear on the receiving side of an assignment.
pub trait Assignable: Variant {}

/// May be invoked by a call.
pub trait Callable: Variant {}

// ─── Runtime capability set ───────────────────────────────────────

bitflags::bitflags! {
    /// The set of capability traits a node kind implements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const ADDRESSABLE = 1 << 0;
        const HAS_VALUE = 1 << 1;
        const ASSIGNABLE = 1 << 2;
        const CALLABLE = 1 << 3;
    }
}

/// Flags named after their traits, so the node table can list trait names
/// once and derive both the trait impls and the runtime set from them.
#[allow(non_upper_case_globals)]
pub(crate) mod flag {
    use super::Capabilities;

    pub const Addressable: Capabilities = Capabilities::ADDRESSABLE;
    pub const HasValue: Capabilities = Capabilities::HAS_VALUE;
    pub const Assignable: Capabilities = Capabilities::ASSIGNABLE;
    pub const Callable: Capabilities = Capabilities::CALLABLE;
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Capabilities::ADDRESSABLE, "addressable"),
            (Capabilities::HAS_VALUE, "has_value"),
            (Capabilities::ASSIGNABLE, "assignable"),
            (Capabilities::CALLABLE, "callable"),
        ]
        .into_iter()
        .filter(|(cap, _)| self.contains(*cap))
        .map(|(_, name)| name)
        .collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join(" + "))
        }
    }
}

// ─── Capability references ────────────────────────────────────────

macro_rules! capability_ref {
    ($(#[$doc:meta])* $name:ident => $cap:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(NodeId);

        impl $name {
            /// The erased handle of the referenced node.
            pub fn id(self) -> NodeId {
                self.0
            }
        }

        impl<T: $cap> From<Id<T>> for $name {
            fn from(id: Id<T>) -> Self {
                Self(id.raw())
            }
        }

        impl From<$name> for NodeId {
            fn from(r: $name) -> Self {
                r.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

capability_ref!(
    /// Reference to any node implementing [`HasValue`].
    ValueRef => HasValue
);
capability_ref!(
    /// Reference to any node implementing [`Assignable`].
    AssignableRef => Assignable
);
capability_ref!(
    /// Reference to any node implementing [`Addressable`].
    AddressRef => Addressable
);
capability_ref!(
    /// Reference to any node implementing [`Callable`].
    CallableRef => Callable
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Ir;
    use crate::node::{CpuRegister, MemoryAddress, NodeKind, VariableDeclaration};

    fn value_count<T: HasValue>(ids: &[Id<T>]) -> usize {
        ids.len()
    }

    #[test]
    fn test_capabilities_follow_trait_impls() {
        assert_eq!(
            NodeKind::CpuRegister.capabilities(),
            Capabilities::ADDRESSABLE | Capabilities::HAS_VALUE
        );
        assert_eq!(
            NodeKind::MemoryAddress.capabilities(),
            Capabilities::ADDRESSABLE | Capabilities::HAS_VALUE
        );
        assert_eq!(
            NodeKind::VariableDeclaration.capabilities(),
            Capabilities::ASSIGNABLE | Capabilities::HAS_VALUE
        );
        assert_eq!(
            NodeKind::FunctionDefinition.capabilities(),
            Capabilities::CALLABLE
        );
        assert_eq!(NodeKind::Call.capabilities(), Capabilities::HAS_VALUE);
    }

    #[test]
    fn test_structural_kinds_have_no_capabilities() {
        for kind in [
            NodeKind::Scope,
            NodeKind::TypeIdentifier,
            NodeKind::Assignment,
            NodeKind::Loop,
            NodeKind::Label,
            NodeKind::Jump,
            NodeKind::OperatorAdd,
            NodeKind::OperatorSub,
            NodeKind::OperatorMul,
            NodeKind::OperatorDiv,
        ] {
            assert!(kind.capabilities().is_empty(), "{} has capabilities", kind);
        }
    }

    #[test]
    fn test_capabilities_display() {
        assert_eq!(
            NodeKind::CpuRegister.capabilities().to_string(),
            "addressable + has_value"
        );
        assert_eq!(NodeKind::Label.capabilities().to_string(), "none");
    }

    #[test]
    fn test_refs_keep_the_underlying_id() {
        let mut ir = Ir::new();
        let eax = ir.cpu_register("eax");
        let mem = ir.memory_address(0x40);
        let value = ValueRef::from(eax);
        let addr = AddressRef::from(mem);
        assert_eq!(value.id(), eax.raw());
        assert_eq!(addr.id(), mem.raw());
        assert_eq!(NodeId::from(value), eax.raw());
    }

    #[test]
    fn test_generic_over_has_value() {
        let mut ir = Ir::new();
        let regs: Vec<Id<CpuRegister>> = vec![ir.cpu_register("r0"), ir.cpu_register("r1")];
        let mems: Vec<Id<MemoryAddress>> = vec![ir.memory_address(0)];
        assert_eq!(value_count(&regs), 2);
        assert_eq!(value_count(&mems), 1);
    }

    #[test]
    fn test_callable_and_assignable_refs() {
        let mut ir = Ir::new();
        let f = ir.function_definition("main");
        let int = ir.type_identifier("int");
        let x: Id<VariableDeclaration> = ir.variable_declaration(int, "x").unwrap();
        let callee = CallableRef::from(f);
        let target = AssignableRef::from(x);
        assert_eq!(callee.id(), f.raw());
        assert_eq!(target.id(), x.raw());
    }
}
