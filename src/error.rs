use thiserror::Error;

use crate::arena::NodeId;
use crate::node::NodeKind;

/// Misuse of the node model: a handle that outlived its node, a handle of
/// the wrong kind, or a mutation that would break the ownership graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("reference to {id} has expired")]
    Expired { id: NodeId },

    #[error("{id} is a {found}, expected {expected}")]
    KindMismatch {
        id: NodeId,
        expected: NodeKind,
        found: NodeKind,
    },

    #[error("attaching {child} to {parent} would create an ownership cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("child index {index} out of range for {scope} ({len} children)")]
    ChildOutOfRange {
        scope: NodeId,
        index: usize,
        len: usize,
    },

    #[error("{id} is still held by {owners} owner(s)")]
    InUse { id: NodeId, owners: u32 },
}
