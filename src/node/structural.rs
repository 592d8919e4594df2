//! Nodes that refer to other nodes.

use serde::{Deserialize, Serialize};

use super::leaf::{Label, TypeIdentifier};
use crate::arena::{Id, NodeId};
use crate::capability::{AddressRef, AssignableRef, CallableRef, ValueRef};

/// An ordered sequence of child nodes. Order is declaration and execution
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub children: Vec<NodeId>,
}

impl Scope {
    pub(crate) fn new() -> Self {
        Self {
            children: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Declares `name` of type `ty`. `location` is absent until an allocation
/// pass assigns a register or memory slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: String,
    pub ty: Id<TypeIdentifier>,
    pub location: Option<AddressRef>,
}

/// `lhs <- rhs`. Both operands are weak: the assignment records the flow
/// and does not keep either side alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub lhs: AssignableRef,
    pub rhs: ValueRef,
}

/// A loop around one body scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loop {
    pub body: Id<Scope>,
}

/// Unconditional transfer to a label. Holds the label alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jump {
    pub label: Id<Label>,
}

macro_rules! binary_operator {
    ($(#[$doc:meta])* $name:ident, $mnemonic:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            pub result: AssignableRef,
            pub lhs: ValueRef,
            pub rhs: ValueRef,
        }

        impl $name {
            pub const MNEMONIC: &'static str = $mnemonic;

            pub(crate) fn new(result: AssignableRef, lhs: ValueRef, rhs: ValueRef) -> Self {
                Self { result, lhs, rhs }
            }
        }
    };
}

binary_operator!(
    /// `result = lhs + rhs`
    Add,
    "add"
);
binary_operator!(
    /// `result = lhs - rhs`
    Sub,
    "sub"
);
binary_operator!(
    /// `result = lhs * rhs`
    Mul,
    "mul"
);
binary_operator!(
    /// `result = lhs / rhs`
    Div,
    "div"
);

/// A named function: ordered parameters and one body scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub parameters: Vec<Id<VariableDeclaration>>,
    pub body: Id<Scope>,
}

/// Invocation of a callable with ordered arguments.
///
/// The callee is a weak reference so a function body may call the function
/// that owns it; the arguments are owned like an operator's operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub callee: CallableRef,
    pub arguments: Vec<ValueRef>,
}
