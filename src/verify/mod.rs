//! Structural verifier: checks a built tree for contract violations the
//! type system cannot rule out.
//!
//! Errors:
//! - an assignment operand or call target whose node has been freed
//! - a weak operand that lacks the capability its slot requires (only
//!   possible for trees that were deserialized or assembled by hand)
//! - a jump to a label that no enclosing scope declares
//!
//! Warnings:
//! - two declarations resolved to the same storage location
//! - two labels with the same name in one scope
//!
//! Verification only reads the arena, so independent roots are checked in
//! parallel by [`verify_all`].


use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};

use crate::arena::{Ir, NodeId};
use crate::capability::Capabilities;
use crate::diagnostic::Diagnostic;
use crate::node::{Node, Scope};
use crate::visit::Visit;

/// Verify the tree owned by `root`.
pub fn verify(ir: &Ir, root: impl Into<NodeId>) -> Vec<Diagnostic> {
    let root = root.into();
    let diagnostics = Verifier::new(ir).run(root);
    tracing::debug!(
        %root,
        errors = diagnostics.iter().filter(|d| d.is_error()).count(),
        total = diagnostics.len(),
        "verified"
    );
    diagnostics
}

/// Verify several roots in parallel. Diagnostics come back in root order.
pub fn verify_all(ir: &Ir, roots: &[NodeId]) -> Vec<Diagnostic> {
    roots
        .par_iter()
        .flat_map_iter(|root| verify(ir, *root))
        .collect()
}

/// Identity of a storage location, compared structurally: two register
/// nodes with the same name are the same location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum LocationKey {
    Register(String),
    Memory(u64),
}

impl std::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationKey::Register(name) => write!(f, "%{}", name),
            LocationKey::Memory(addr) => write!(f, "[{:#x}]", addr),
        }
    }
}

struct Verifier<'a> {
    ir: &'a Ir,
    diagnostics: Vec<Diagnostic>,
    /// Enclosing scopes of the current node: (depth, labels declared there).
    scopes: Vec<(usize, HashSet<NodeId>)>,
    /// Shared nodes are checked once.
    seen: HashSet<NodeId>,
    locations: BTreeMap<LocationKey, Vec<(NodeId, String)>>,
}

impl<'a> Verifier<'a> {
    fn new(ir: &'a Ir) -> Self {
        Self {
            ir,
            diagnostics: Vec::new(),
            scopes: Vec::new(),
            seen: HashSet::new(),
            locations: BTreeMap::new(),
        }
    }

    fn run(mut self, root: NodeId) -> Vec<Diagnostic> {
        let ir = self.ir;
        let walk = match ir.walk(root) {
            Ok(walk) => walk,
            Err(err) => return vec![Diagnostic::error(err.to_string(), root)],
        };
        for visit in walk {
            while self
                .scopes
                .last()
                .is_some_and(|(depth, _)| *depth >= visit.depth)
            {
                self.scopes.pop();
            }
            self.check(visit);
        }
        self.report_aliases();
        self.diagnostics
    }

    fn check(&mut self, visit: Visit<'_>) {
        let Visit { id, node, depth } = visit;
        match node {
            Node::Scope(scope) => self.enter_scope(id, scope, depth),
            Node::Assignment(assign) => {
                if self.seen.insert(id) {
                    self.check_weak(id, assign.lhs.id(), Capabilities::ASSIGNABLE, "target");
                    self.check_weak(id, assign.rhs.id(), Capabilities::HAS_VALUE, "value");
                }
            }
            Node::Call(call) => {
                if self.seen.insert(id) {
                    self.check_weak(id, call.callee.id(), Capabilities::CALLABLE, "callee");
                }
            }
            Node::Jump(jump) => {
                let declared = self
                    .scopes
                    .iter()
                    .any(|(_, labels)| labels.contains(&jump.label.raw()));
                if !declared {
                    let name = self
                        .ir
                        .get(jump.label)
                        .map(|l| l.name.clone())
                        .unwrap_or_default();
                    self.diagnostics.push(
                        Diagnostic::error(
                            format!("jump to label `{}` not declared in an enclosing scope", name),
                            id,
                        )
                        .with_help("append the label to the jump's scope or an outer one".into()),
                    );
                }
            }
            Node::VariableDeclaration(var) => {
                if self.seen.insert(id) {
                    if let Some(key) = var.location.and_then(|loc| self.location_key(loc.id())) {
                        self.locations
                            .entry(key)
                            .or_default()
                            .push((id, var.name.clone()));
                    }
                }
            }
            Node::TypeIdentifier(_)
            | Node::MemoryAddress(_)
            | Node::CpuRegister(_)
            | Node::Loop(_)
            | Node::Label(_)
            | Node::Add(_)
            | Node::Sub(_)
            | Node::Mul(_)
            | Node::Div(_)
            | Node::FunctionDefinition(_) => {}
        }
    }

    fn enter_scope(&mut self, id: NodeId, scope: &Scope, depth: usize) {
        let mut labels = HashSet::new();
        let mut names: BTreeMap<&str, usize> = BTreeMap::new();
        for child in &scope.children {
            if let Ok(Node::Label(label)) = self.ir.node(*child) {
                labels.insert(*child);
                *names.entry(label.name.as_str()).or_default() += 1;
            }
        }
        for (name, count) in names {
            if count > 1 {
                self.diagnostics.push(Diagnostic::warning(
                    format!("label `{}` declared {} times in one scope", name, count),
                    id,
                ));
            }
        }
        self.scopes.push((depth, labels));
    }

    /// Check a weak operand of `owner`: it must be live and carry `required`.
    fn check_weak(&mut self, owner: NodeId, target: NodeId, required: Capabilities, role: &str) {
        match self.ir.node(target) {
            Err(_) => self.diagnostics.push(
                Diagnostic::error(format!("{} {} has expired", role, target), owner)
                    .with_note("weak references do not keep their target alive".into()),
            ),
            Ok(node) if !node.capabilities().contains(required) => {
                self.diagnostics.push(Diagnostic::error(
                    format!(
                        "{} {} is a {}, which is not {}",
                        role,
                        target,
                        node.kind(),
                        required
                    ),
                    owner,
                ))
            }
            Ok(_) => {}
        }
    }

    fn location_key(&self, id: NodeId) -> Option<LocationKey> {
        match self.ir.node(id).ok()? {
            Node::CpuRegister(reg) => Some(LocationKey::Register(reg.name.clone())),
            Node::MemoryAddress(mem) => Some(LocationKey::Memory(mem.location)),
            _ => None,
        }
    }

    fn report_aliases(&mut self) {
        for (key, vars) in std::mem::take(&mut self.locations) {
            let Some(((_, first), rest)) = vars.split_first() else {
                continue;
            };
            for (id, name) in rest {
                self.diagnostics.push(
                    Diagnostic::warning(
                        format!("`{}` shares storage {} with `{}`", name, key, first),
                        *id,
                    )
                    .with_help("aliasing is allowed only for deliberate overlays".into()),
                );
            }
        }
    }
}
