//! Asteroid IR: the node model of a low-level intermediate representation.
//!
//! A program is a tree of nodes held in an [`Ir`] arena. Nodes refer to
//! each other through generational handles; owning edges keep a node
//! alive, weak edges (assignment operands, call targets) do not, and a
//! handle whose node has been freed resolves to [`IrError::Expired`].
//!
//! What a node may be used as is expressed by the capability traits in
//! [`capability`]: only [`Assignable`] nodes can be assigned to, only
//! [`HasValue`] nodes can be read, and so on. The structural constructors
//! on [`Ir`] accept capability references, so a misuse is a type error.

pub mod arena;
pub mod capability;
pub mod diagnostic;
pub mod display;
pub mod error;
pub mod hash;
pub mod node;
pub mod verify;
pub mod visit;

pub use arena::{Id, Ir, NodeId};
pub use capability::{
    Addressable, AddressRef, Assignable, AssignableRef, Callable, CallableRef, Capabilities,
    HasValue, ValueRef,
};
pub use diagnostic::{Diagnostic, Severity};
pub use display::PrintConfig;
pub use error::IrError;
pub use hash::ContentHash;
pub use node::{
    Add, Assignment, Call, CpuRegister, Div, FunctionDefinition, Jump, Label, Loop,
    MemoryAddress, Mul, Node, NodeKind, Scope, Sub, TypeIdentifier, Variant, VariableDeclaration,
};
pub use verify::{verify, verify_all};
pub use visit::{Visit, Visitor, Walk};
