//! Tree traversal over owning edges.
//!
//! The walk is pre-order and follows only owning edges, so it terminates
//! on every well-formed tree. A node shared by two owners (a type used by
//! two declarations, a label held by its scope and by a jump) is visited
//! once per owner. Weak edges are reported to visitors but never followed.

use crate::arena::{Id, Ir, NodeId};
use crate::error::IrError;
use crate::node::*;

// ─── Walk ─────────────────────────────────────────────────────────

/// One step of a walk.
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub id: NodeId,
    pub node: &'a Node,
    /// Distance from the walk's root (root = 0).
    pub depth: usize,
}

/// Pre-order iterator returned by [`Ir::walk`].
pub struct Walk<'a> {
    ir: &'a Ir,
    stack: Vec<(NodeId, usize)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, depth)) = self.stack.pop() {
            // Owned edges of a live node are always live.
            let Ok(node) = self.ir.node(id) else {
                continue;
            };
            for child in node.owned_edges().into_iter().rev() {
                self.stack.push((child, depth + 1));
            }
            return Some(Visit { id, node, depth });
        }
        None
    }
}

impl Ir {
    /// Walk the subtree owned by `root`, root first.
    pub fn walk(&self, root: impl Into<NodeId>) -> Result<Walk<'_>, IrError> {
        let root = root.into();
        self.node(root)?;
        Ok(Walk {
            ir: self,
            stack: vec![(root, 0)],
        })
    }
}

// ─── Visitor ──────────────────────────────────────────────────────

/// One hook per node kind; every hook defaults to doing nothing.
#[allow(unused_variables)]
pub trait Visitor {
    fn scope(&mut self, id: Id<Scope>, node: &Scope, depth: usize) {}
    fn type_identifier(&mut self, id: Id<TypeIdentifier>, node: &TypeIdentifier, depth: usize) {}
    fn memory_address(&mut self, id: Id<MemoryAddress>, node: &MemoryAddress, depth: usize) {}
    fn cpu_register(&mut self, id: Id<CpuRegister>, node: &CpuRegister, depth: usize) {}
    fn variable_declaration(
        &mut self,
        id: Id<VariableDeclaration>,
        node: &VariableDeclaration,
        depth: usize,
    ) {
    }
    fn assignment(&mut self, id: Id<Assignment>, node: &Assignment, depth: usize) {}
    fn loop_node(&mut self, id: Id<Loop>, node: &Loop, depth: usize) {}
    fn label(&mut self, id: Id<Label>, node: &Label, depth: usize) {}
    fn jump(&mut self, id: Id<Jump>, node: &Jump, depth: usize) {}
    fn add(&mut self, id: Id<Add>, node: &Add, depth: usize) {}
    fn sub(&mut self, id: Id<Sub>, node: &Sub, depth: usize) {}
    fn mul(&mut self, id: Id<Mul>, node: &Mul, depth: usize) {}
    fn div(&mut self, id: Id<Div>, node: &Div, depth: usize) {}
    fn function_definition(
        &mut self,
        id: Id<FunctionDefinition>,
        node: &FunctionDefinition,
        depth: usize,
    ) {
    }
    fn call(&mut self, id: Id<Call>, node: &Call, depth: usize) {}
}

/// Route one visit to the hook for its kind.
pub fn dispatch<V: Visitor + ?Sized>(visitor: &mut V, visit: Visit<'_>) {
    let Visit { id, node, depth } = visit;
    match node {
        Node::Scope(n) => visitor.scope(Id::from_raw(id), n, depth),
        Node::TypeIdentifier(n) => visitor.type_identifier(Id::from_raw(id), n, depth),
        Node::MemoryAddress(n) => visitor.memory_address(Id::from_raw(id), n, depth),
        Node::CpuRegister(n) => visitor.cpu_register(Id::from_raw(id), n, depth),
        Node::VariableDeclaration(n) => visitor.variable_declaration(Id::from_raw(id), n, depth),
        Node::Assignment(n) => visitor.assignment(Id::from_raw(id), n, depth),
        Node::Loop(n) => visitor.loop_node(Id::from_raw(id), n, depth),
        Node::Label(n) => visitor.label(Id::from_raw(id), n, depth),
        Node::Jump(n) => visitor.jump(Id::from_raw(id), n, depth),
        Node::Add(n) => visitor.add(Id::from_raw(id), n, depth),
        Node::Sub(n) => visitor.sub(Id::from_raw(id), n, depth),
        Node::Mul(n) => visitor.mul(Id::from_raw(id), n, depth),
        Node::Div(n) => visitor.div(Id::from_raw(id), n, depth),
        Node::FunctionDefinition(n) => visitor.function_definition(Id::from_raw(id), n, depth),
        Node::Call(n) => visitor.call(Id::from_raw(id), n, depth),
    }
}

/// Walk `root` and hand every node to `visitor`.
pub fn walk<V: Visitor + ?Sized>(
    ir: &Ir,
    root: impl Into<NodeId>,
    visitor: &mut V,
) -> Result<(), IrError> {
    for visit in ir.walk(root)? {
        dispatch(visitor, visit);
    }
    Ok(())
}
