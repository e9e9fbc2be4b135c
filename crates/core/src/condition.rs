//! Condition trees
//!
//! A condition tree is the guard expression of a plugin: a boolean expression
//! over the operation under review. Nodes live in an arena addressed by stable
//! indices with an explicit root, so child references are plain indices and a
//! tree can be validated once when the plugin is registered.

use serde::{Deserialize, Serialize};

use crate::program::Opcode;
use crate::Address;

/// Index of a node inside a condition tree's arena.
pub type NodeId = usize;

/// A leaf predicate comparing a value derived from the operation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    /// The operation's operator address equals the given address.
    OperatorEquals(Address),
    /// The operation's operator address is one of the given addresses.
    OperatorInList(Vec<Address>),
    /// The operation's opcode equals the given opcode.
    OpcodeEquals(Opcode),
    /// The operation's opcode is one of the given opcodes.
    OpcodeInList(Vec<Opcode>),
}

/// One node of a condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionNode {
    /// Always true; used for unconditional gates.
    LiteralTrue,
    /// Leaf comparison against the operation context.
    Comparison(Comparison),
    /// True iff every child evaluates true.
    And(Vec<NodeId>),
    /// True iff any child evaluates true.
    Or(Vec<NodeId>),
    /// Negation of the single child.
    Not(NodeId),
}

/// An arena of condition nodes plus the root index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionTree {
    /// Node arena; children reference nodes by index.
    pub nodes: Vec<ConditionNode>,
    /// Index of the root node.
    pub root: NodeId,
}

impl ConditionTree {
    /// A tree with the given nodes rooted at the first node.
    pub fn new(nodes: Vec<ConditionNode>) -> Self {
        Self { nodes, root: 0 }
    }

    /// The single-node tree that always fires.
    pub fn literal_true() -> Self {
        Self::new(vec![ConditionNode::LiteralTrue])
    }

    /// A single-comparison tree.
    pub fn comparison(cmp: Comparison) -> Self {
        Self::new(vec![ConditionNode::Comparison(cmp)])
    }

    /// Child indices of a node, empty for leaves.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id] {
            ConditionNode::And(children) | ConditionNode::Or(children) => children,
            ConditionNode::Not(child) => std::slice::from_ref(child),
            ConditionNode::LiteralTrue | ConditionNode::Comparison(_) => &[],
        }
    }
}
