//! Node model: the closed set of IR node kinds and the data they carry.
//!
//! Every node lives in an [`Ir`](crate::arena::Ir) arena and refers to other
//! nodes through handles. Owning edges keep their target alive; the only
//! weak edges are an assignment's operands and a call's callee, which record
//! a relation without extending the target's lifetime.
//!
//! The discriminant of a node is never stored separately from its data: it
//! is the variant of [`Node`] the data sits in, so a node cannot report a
//! kind that disagrees with its shape.

mod leaf;
mod structural;

pub use leaf::{CpuRegister, Label, MemoryAddress, TypeIdentifier};
pub use structural::{
    Add, Assignment, Call, Div, FunctionDefinition, Jump, Loop, Mul, Scope, Sub,
    VariableDeclaration,
};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::arena::NodeId;
use crate::capability::Capabilities;

// ─── Discriminant ─────────────────────────────────────────────────

/// The concrete kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Scope,
    TypeIdentifier,
    MemoryAddress,
    CpuRegister,
    VariableDeclaration,
    Assignment,
    Loop,
    Label,
    Jump,
    OperatorAdd,
    OperatorSub,
    OperatorMul,
    OperatorDiv,
    FunctionDefinition,
    Call,
}

impl NodeKind {
    pub const ALL: [NodeKind; 15] = [
        NodeKind::Scope,
        NodeKind::TypeIdentifier,
        NodeKind::MemoryAddress,
        NodeKind::CpuRegister,
        NodeKind::VariableDeclaration,
        NodeKind::Assignment,
        NodeKind::Loop,
        NodeKind::Label,
        NodeKind::Jump,
        NodeKind::OperatorAdd,
        NodeKind::OperatorSub,
        NodeKind::OperatorMul,
        NodeKind::OperatorDiv,
        NodeKind::FunctionDefinition,
        NodeKind::Call,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Scope => "scope",
            NodeKind::TypeIdentifier => "type_identifier",
            NodeKind::MemoryAddress => "memory_address",
            NodeKind::CpuRegister => "cpu_register",
            NodeKind::VariableDeclaration => "variable_declaration",
            NodeKind::Assignment => "assignment",
            NodeKind::Loop => "loop",
            NodeKind::Label => "label",
            NodeKind::Jump => "jump",
            NodeKind::OperatorAdd => "operator_add",
            NodeKind::OperatorSub => "operator_sub",
            NodeKind::OperatorMul => "operator_mul",
            NodeKind::OperatorDiv => "operator_div",
            NodeKind::FunctionDefinition => "function_definition",
            NodeKind::Call => "call",
        }
    }

    /// True for the four binary arithmetic operators.
    pub fn is_operator(self) -> bool {
        matches!(
            self,
            NodeKind::OperatorAdd
                | NodeKind::OperatorSub
                | NodeKind::OperatorMul
                | NodeKind::OperatorDiv
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Node ─────────────────────────────────────────────────────────

/// Any IR node. Matching on this enum is the exhaustive dispatch point for
/// passes: adding a kind makes every such `match` fail to compile until the
/// new variant is handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Scope(Scope),
    TypeIdentifier(TypeIdentifier),
    MemoryAddress(MemoryAddress),
    CpuRegister(CpuRegister),
    VariableDeclaration(VariableDeclaration),
    Assignment(Assignment),
    Loop(Loop),
    Label(Label),
    Jump(Jump),
    Add(Add),
    Sub(Sub),
    Mul(Mul),
    Div(Div),
    FunctionDefinition(FunctionDefinition),
    Call(Call),
}

impl Node {
    /// Handles this node keeps alive, in field order.
    pub fn owned_edges(&self) -> Vec<NodeId> {
        match self {
            Node::Scope(scope) => scope.children.clone(),
            Node::TypeIdentifier(ty) => ty.components.iter().map(|c| c.raw()).collect(),
            Node::MemoryAddress(_) | Node::CpuRegister(_) | Node::Label(_) => Vec::new(),
            Node::VariableDeclaration(var) => {
                let mut edges = vec![var.ty.raw()];
                edges.extend(var.location.map(|loc| loc.id()));
                edges
            }
            Node::Assignment(_) => Vec::new(),
            Node::Loop(l) => vec![l.body.raw()],
            Node::Jump(jump) => vec![jump.label.raw()],
            Node::Add(op) => vec![op.result.id(), op.lhs.id(), op.rhs.id()],
            Node::Sub(op) => vec![op.result.id(), op.lhs.id(), op.rhs.id()],
            Node::Mul(op) => vec![op.result.id(), op.lhs.id(), op.rhs.id()],
            Node::Div(op) => vec![op.result.id(), op.lhs.id(), op.rhs.id()],
            Node::FunctionDefinition(func) => {
                let mut edges: Vec<NodeId> = func.parameters.iter().map(|p| p.raw()).collect();
                edges.push(func.body.raw());
                edges
            }
            Node::Call(call) => call.arguments.iter().map(|a| a.id()).collect(),
        }
    }

    /// Handles this node refers to without keeping them alive.
    pub fn weak_edges(&self) -> Vec<NodeId> {
        match self {
            Node::Assignment(assign) => vec![assign.lhs.id(), assign.rhs.id()],
            Node::Call(call) => vec![call.callee.id()],
            _ => Vec::new(),
        }
    }

    /// The capability set of this node's kind.
    pub fn capabilities(&self) -> Capabilities {
        self.kind().capabilities()
    }
}

// ─── Variant table ────────────────────────────────────────────────

/// Implemented by every concrete node type. Ties the type to its fixed
/// discriminant and capability set.
pub trait Variant: Sized + Into<Node> {
    const KIND: NodeKind;
    const CAPABILITIES: Capabilities;

    fn from_node(node: &Node) -> Option<&Self>;
    fn from_node_mut(node: &mut Node) -> Option<&mut Self>;
}

macro_rules! variants {
    ($($variant:ident => $kind:ident [$($cap:ident),*];)+) => {
        $(
            impl From<$variant> for Node {
                fn from(node: $variant) -> Self {
                    Node::$variant(node)
                }
            }

            impl Variant for $variant {
                const KIND: NodeKind = NodeKind::$kind;
                const CAPABILITIES: Capabilities =
                    Capabilities::empty()$(.union(crate::capability::flag::$cap))*;

                fn from_node(node: &Node) -> Option<&Self> {
                    match node {
                        Node::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn from_node_mut(node: &mut Node) -> Option<&mut Self> {
                    match node {
                        Node::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            $(impl crate::capability::$cap for $variant {})*
        )+

        impl Node {
            /// The discriminant of this node.
            pub fn kind(&self) -> NodeKind {
                match self {
                    $(Node::$variant(_) => NodeKind::$kind,)+
                }
            }
        }

        impl NodeKind {
            /// The capability traits implemented by nodes of this kind.
            pub fn capabilities(self) -> Capabilities {
                match self {
                    $(NodeKind::$kind => <$variant as Variant>::CAPABILITIES,)+
                }
            }
        }
    };
}

variants! {
    Scope => Scope [];
    TypeIdentifier => TypeIdentifier [];
    MemoryAddress => MemoryAddress [Addressable, HasValue];
    CpuRegister => CpuRegister [Addressable, HasValue];
    VariableDeclaration => VariableDeclaration [Assignable, HasValue];
    Assignment => Assignment [];
    Loop => Loop [];
    Label => Label [];
    Jump => Jump [];
    Add => OperatorAdd [];
    Sub => OperatorSub [];
    Mul => OperatorMul [];
    Div => OperatorDiv [];
    FunctionDefinition => FunctionDefinition [Callable];
    Call => Call [HasValue];
}
