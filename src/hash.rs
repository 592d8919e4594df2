//! Structural content hashing of IR subtrees.
//!
//! The hash depends only on the shape and data of a tree, never on arena
//! handles: two trees built separately from the same constructor calls
//! hash the same, and two registers named `eax` are interchangeable.
//!
//! A node's hash covers its own data followed by the hashes of its owned
//! children in field order. Weak operands are hashed by reference form
//! only (kind plus name or address), so a call inside a body that targets
//! its own function does not feed back into itself.

use std::collections::HashMap;

use crate::arena::{Ir, NodeId};
use crate::error::IrError;
use crate::node::Node;

const HASH_VERSION: u8 = 1;

// ─── Serialization Format Tags ─────────────────────────────────────

const TAG_SCOPE: u8 = 0x01;
const TAG_TYPE: u8 = 0x02;
const TAG_MEMORY: u8 = 0x03;
const TAG_REGISTER: u8 = 0x04;
const TAG_VAR: u8 = 0x05;
const TAG_ASSIGN: u8 = 0x06;
const TAG_LOOP: u8 = 0x07;
const TAG_LABEL: u8 = 0x08;
const TAG_JUMP: u8 = 0x09;
const TAG_ADD: u8 = 0x0A;
const TAG_SUB: u8 = 0x0B;
const TAG_MUL: u8 = 0x0C;
const TAG_DIV: u8 = 0x0D;
const TAG_FN_DEF: u8 = 0x0E;
const TAG_CALL: u8 = 0x0F;
const TAG_NONE: u8 = 0xF0;
const TAG_WEAK: u8 = 0xF1;
const TAG_EXPIRED: u8 = 0xFF;

// ─── Content Hash ──────────────────────────────────────────────────

/// Structural fingerprint of an IR subtree (BLAKE3, 256 bits).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// All 64 hex digits.
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    /// The first 12 hex digits, enough to tell trees apart in a dump.
    pub fn to_short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

impl Ir {
    /// Hash the tree owned by `root`.
    ///
    /// Each node is hashed once, over its own data followed by the hashes
    /// of its owned children, so a node shared by several owners costs
    /// the same as an unshared one.
    pub fn content_hash(&self, root: impl Into<NodeId>) -> Result<ContentHash, IrError> {
        let root = root.into();
        let mut done: HashMap<NodeId, ContentHash> = HashMap::new();
        let mut pending = vec![(root, false)];
        while let Some((id, children_done)) = pending.pop() {
            if done.contains_key(&id) {
                continue;
            }
            let node = self.node(id)?;
            let children = node.owned_edges();
            if !children_done {
                pending.push((id, true));
                pending.extend(
                    children
                        .into_iter()
                        .filter(|c| !done.contains_key(c))
                        .map(|c| (c, false)),
                );
                continue;
            }
            let mut buf = vec![HASH_VERSION];
            self.serialize_fields(node, &mut buf);
            for child in children {
                let hash = done.get(&child).ok_or(IrError::Expired { id: child })?;
                buf.extend_from_slice(&hash.0);
            }
            done.insert(id, ContentHash(*blake3::hash(&buf).as_bytes()));
        }
        done.get(&root).copied().ok_or(IrError::Expired { id: root })
    }

    /// The node's own data. Owned children are appended by the caller.
    fn serialize_fields(&self, node: &Node, buf: &mut Vec<u8>) {
        match node {
            Node::Scope(scope) => {
                buf.push(TAG_SCOPE);
                put_len(buf, scope.children.len());
            }
            Node::TypeIdentifier(ty) => {
                buf.push(TAG_TYPE);
                put_str(buf, &ty.name);
                buf.extend_from_slice(&ty.width.to_le_bytes());
                put_len(buf, ty.components.len());
            }
            Node::MemoryAddress(mem) => {
                buf.push(TAG_MEMORY);
                buf.extend_from_slice(&mem.location.to_le_bytes());
            }
            Node::CpuRegister(reg) => {
                buf.push(TAG_REGISTER);
                put_str(buf, &reg.name);
            }
            Node::VariableDeclaration(var) => {
                buf.push(TAG_VAR);
                put_str(buf, &var.name);
                if var.location.is_none() {
                    buf.push(TAG_NONE);
                }
            }
            Node::Assignment(assign) => {
                buf.push(TAG_ASSIGN);
                self.serialize_weak(assign.lhs.id(), buf);
                self.serialize_weak(assign.rhs.id(), buf);
            }
            Node::Loop(_) => buf.push(TAG_LOOP),
            Node::Label(label) => {
                buf.push(TAG_LABEL);
                put_str(buf, &label.name);
            }
            Node::Jump(_) => buf.push(TAG_JUMP),
            Node::Add(_) => buf.push(TAG_ADD),
            Node::Sub(_) => buf.push(TAG_SUB),
            Node::Mul(_) => buf.push(TAG_MUL),
            Node::Div(_) => buf.push(TAG_DIV),
            Node::FunctionDefinition(func) => {
                buf.push(TAG_FN_DEF);
                put_str(buf, &func.name);
                put_len(buf, func.parameters.len());
            }
            Node::Call(call) => {
                buf.push(TAG_CALL);
                self.serialize_weak(call.callee.id(), buf);
                put_len(buf, call.arguments.len());
            }
        }
    }

    fn serialize_weak(&self, id: NodeId, buf: &mut Vec<u8>) {
        let Ok(node) = self.node(id) else {
            buf.push(TAG_EXPIRED);
            return;
        };
        buf.push(TAG_WEAK);
        match node {
            Node::VariableDeclaration(var) => {
                buf.push(TAG_VAR);
                put_str(buf, &var.name);
            }
            Node::CpuRegister(reg) => {
                buf.push(TAG_REGISTER);
                put_str(buf, &reg.name);
            }
            Node::MemoryAddress(mem) => {
                buf.push(TAG_MEMORY);
                buf.extend_from_slice(&mem.location.to_le_bytes());
            }
            Node::FunctionDefinition(func) => {
                buf.push(TAG_FN_DEF);
                put_str(buf, &func.name);
            }
            other => buf.push(other.kind() as u8),
        }
    }
}

fn put_len(buf: &mut Vec<u8>, len: usize) {
    buf.extend_from_slice(&(len as u32).to_le_bytes());
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_len(buf, s.len());
    buf.extend_from_slice(s.as_bytes());
}
