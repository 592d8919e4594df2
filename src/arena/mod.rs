//! Generational arena that owns every node of an IR tree.
//!
//! Nodes are addressed by [`NodeId`] (index + generation) or by the typed
//! [`Id<T>`]. Freeing a node bumps its slot's generation, so any handle
//! minted before the free resolves to [`IrError::Expired`] instead of
//! reading whatever reuses the slot.
//!
//! Ownership is counted per node: `owners` is the number of owning edges
//! pointing at it. A node is created detached (no owners) and lives until
//! its last owner lets go of it, or until a detached node is freed
//! explicitly. Freeing cascades through owning edges only; weak edges
//! never keep anything alive.

mod build;
#[cfg(test)]
mod tests;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::error::IrError;
use crate::node::{Node, NodeKind, Variant};

// ─── Handles ──────────────────────────────────────────────────────

/// Erased handle to a node in an [`Ir`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Handle to a node known to be of kind `T`.
pub struct Id<T> {
    raw: NodeId,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub(crate) fn from_raw(raw: NodeId) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    pub fn raw(self) -> NodeId {
        self.raw
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T: Variant> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Id<{}>({}v{})",
            T::KIND,
            self.raw.index,
            self.raw.generation
        )
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl<T> From<Id<T>> for NodeId {
    fn from(id: Id<T>) -> Self {
        id.raw
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        NodeId::deserialize(deserializer).map(Id::from_raw)
    }
}

// ─── Arena ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    node: Node,
    /// Derived from the owning edges of other entries, never trusted from
    /// the wire.
    #[serde(skip)]
    owners: u32,
}

/// Owner of all nodes of one or more IR trees.
///
/// Only the slots are persisted. Loading rebuilds the free list, the live
/// count and every owner count, and rejects dangling owning edges and
/// ownership cycles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "RawIr")]
pub struct Ir {
    slots: Vec<Slot>,
    #[serde(skip_serializing)]
    free: Vec<u32>,
    #[serde(skip_serializing)]
    live: usize,
}

/// Wire form of an [`Ir`].
#[derive(Deserialize)]
struct RawIr {
    slots: Vec<Slot>,
}

impl TryFrom<RawIr> for Ir {
    type Error = IrError;

    fn try_from(raw: RawIr) -> Result<Self, IrError> {
        let mut ir = Ir {
            slots: raw.slots,
            free: Vec::new(),
            live: 0,
        };
        for (index, slot) in ir.slots.iter_mut().enumerate().rev() {
            match &mut slot.entry {
                Some(entry) => {
                    entry.owners = 0;
                    ir.live += 1;
                }
                None => ir.free.push(index as u32),
            }
        }
        let ids: Vec<NodeId> = ir.ids().collect();
        for id in ids {
            let edges = ir.node(id)?.owned_edges();
            for edge in edges {
                ir.retain(edge)?;
            }
        }
        ir.check_acyclic()?;
        tracing::debug!(nodes = ir.live, slots = ir.slots.len(), "loaded arena");
        Ok(ir)
    }
}

impl Ir {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn contains(&self, id: impl Into<NodeId>) -> bool {
        self.entry(id.into()).is_ok()
    }

    /// Resolve any handle to its node.
    pub fn node(&self, id: impl Into<NodeId>) -> Result<&Node, IrError> {
        self.entry(id.into()).map(|e| &e.node)
    }

    pub fn kind(&self, id: impl Into<NodeId>) -> Result<NodeKind, IrError> {
        self.node(id).map(Node::kind)
    }

    /// Resolve a typed handle.
    pub fn get<T: Variant>(&self, id: Id<T>) -> Result<&T, IrError> {
        let node = self.node(id.raw)?;
        T::from_node(node).ok_or(IrError::KindMismatch {
            id: id.raw,
            expected: T::KIND,
            found: node.kind(),
        })
    }

    /// Recover a typed handle from an erased one.
    pub fn downcast<T: Variant>(&self, id: impl Into<NodeId>) -> Result<Id<T>, IrError> {
        let id = id.into();
        let found = self.kind(id)?;
        if found == T::KIND {
            Ok(Id::from_raw(id))
        } else {
            Err(IrError::KindMismatch {
                id,
                expected: T::KIND,
                found,
            })
        }
    }

    /// Number of owning edges currently pointing at a node.
    pub fn owner_count(&self, id: impl Into<NodeId>) -> Result<u32, IrError> {
        self.entry(id.into()).map(|e| e.owners)
    }

    /// Handles of every live node, in slot order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry
                .as_ref()
                .map(|_| NodeId::new(index as u32, slot.generation))
        })
    }

    /// Live nodes that nothing owns: tree roots and not-yet-attached nodes.
    pub fn detached(&self) -> Vec<NodeId> {
        self.ids()
            .filter(|id| matches!(self.owner_count(*id), Ok(0)))
            .collect()
    }

    /// Shallow copy: the new node shares every node the original owns.
    pub fn duplicate<T: Variant + Clone>(&mut self, id: Id<T>) -> Result<Id<T>, IrError> {
        let copy = self.get(id)?.clone();
        self.insert(copy)
    }

    /// Free a detached node and everything only it was keeping alive.
    pub fn free(&mut self, id: impl Into<NodeId>) -> Result<(), IrError> {
        let id = id.into();
        let owners = self.owner_count(id)?;
        if owners > 0 {
            return Err(IrError::InUse { id, owners });
        }
        self.destroy(id);
        Ok(())
    }

    // ─── Internals ────────────────────────────────────────────────

    fn entry(&self, id: NodeId) -> Result<&Entry, IrError> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
            .ok_or(IrError::Expired { id })
    }

    fn entry_mut(&mut self, id: NodeId) -> Result<&mut Entry, IrError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
            .ok_or(IrError::Expired { id })
    }

    pub(crate) fn get_mut<T: Variant>(&mut self, id: Id<T>) -> Result<&mut T, IrError> {
        let entry = self.entry_mut(id.raw)?;
        let found = entry.node.kind();
        T::from_node_mut(&mut entry.node).ok_or(IrError::KindMismatch {
            id: id.raw,
            expected: T::KIND,
            found,
        })
    }

    /// Place a node into a slot with `owners` owning edges already
    /// pointing at it.
    fn alloc(&mut self, node: Node, owners: u32) -> NodeId {
        self.live += 1;
        let entry = Some(Entry { node, owners });
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = entry;
            NodeId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                entry,
            });
            NodeId::new(index, 0)
        }
    }

    pub(crate) fn alloc_leaf<T: Variant>(&mut self, node: T) -> Id<T> {
        Id::from_raw(self.alloc(node.into(), 0))
    }

    /// Place a node into the arena, taking ownership of its owned edges.
    /// Every edge, owned or weak, must be live.
    pub(crate) fn insert<T: Variant>(&mut self, node: T) -> Result<Id<T>, IrError> {
        let node: Node = node.into();
        let owned = node.owned_edges();
        for edge in owned.iter().chain(node.weak_edges().iter()) {
            self.entry(*edge)?;
        }
        for edge in &owned {
            self.retain(*edge)?;
        }
        Ok(Id::from_raw(self.alloc(node, 0)))
    }

    pub(crate) fn retain(&mut self, id: NodeId) -> Result<(), IrError> {
        self.entry_mut(id)?.owners += 1;
        Ok(())
    }

    /// Drop one owning edge to `id`; destroys it if that was the last one.
    pub(crate) fn release(&mut self, id: NodeId) -> Result<(), IrError> {
        let entry = self.entry_mut(id)?;
        entry.owners = entry.owners.saturating_sub(1);
        if entry.owners == 0 {
            self.destroy(id);
        }
        Ok(())
    }

    /// Remove `id` and cascade through nodes it was the last owner of.
    fn destroy(&mut self, id: NodeId) {
        let mut pending = vec![id];
        let mut freed = 0usize;
        while let Some(id) = pending.pop() {
            let slot = &mut self.slots[id.index as usize];
            let Some(entry) = slot.entry.take() else {
                continue;
            };
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
            self.live -= 1;
            freed += 1;
            tracing::trace!(node = %id, kind = %entry.node.kind(), "freed");

            for edge in entry.node.owned_edges() {
                if let Ok(child) = self.entry_mut(edge) {
                    child.owners = child.owners.saturating_sub(1);
                    if child.owners == 0 {
                        pending.push(edge);
                    }
                }
            }
        }
        tracing::debug!(root = %id, freed, "released subtree");
    }

    /// True when `target` is reachable from `from` over owning edges.
    pub(crate) fn reaches(&self, from: NodeId, target: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Ok(entry) = self.entry(id) {
                stack.extend(entry.node.owned_edges());
            }
        }
        false
    }

    /// Reject an arena whose owning edges contain a cycle. Iterative
    /// three-colour depth-first search over every live node.
    fn check_acyclic(&self) -> Result<(), IrError> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Unseen,
            Open,
            Done,
        }

        let mut marks = vec![Mark::Unseen; self.slots.len()];
        for root in self.ids() {
            if marks[root.index as usize] != Mark::Unseen {
                continue;
            }
            marks[root.index as usize] = Mark::Open;
            let mut stack = vec![(root, self.node(root)?.owned_edges(), 0usize)];
            while let Some((parent, edges, next)) = stack.last_mut() {
                let Some(&child) = edges.get(*next) else {
                    marks[parent.index as usize] = Mark::Done;
                    stack.pop();
                    continue;
                };
                *next += 1;
                match marks[child.index as usize] {
                    Mark::Open => {
                        return Err(IrError::Cycle {
                            parent: *parent,
                            child,
                        })
                    }
                    Mark::Done => {}
                    Mark::Unseen => {
                        marks[child.index as usize] = Mark::Open;
                        let edges = self.node(child)?.owned_edges();
                        stack.push((child, edges, 0));
                    }
                }
            }
        }
        Ok(())
    }

    /// Reject an owning edge `parent -> child` that would close a cycle.
    pub(crate) fn check_edge(&self, parent: NodeId, child: NodeId) -> Result<(), IrError> {
        self.entry(parent)?;
        self.entry(child)?;
        if self.reaches(child, parent) {
            tracing::debug!(%parent, %child, "rejected cyclic edge");
            return Err(IrError::Cycle { parent, child });
        }
        Ok(())
    }
}
