//! Condition tree validation and evaluation
//!
//! Trees are validated once when a plugin is registered (missing children,
//! cycles, depth), so repeated gate checks stay cheap. Evaluation keeps the
//! same guards anyway: a tree handed to the evaluator is not assumed to have
//! gone through registration.

use std::collections::HashSet;

use agora_core::{Address, Comparison, ConditionNode, ConditionTree, NodeId, Opcode};

use crate::error::{EngineError, EngineResult};

/// Depth guard for condition evaluation.
pub const MAX_CONDITION_DEPTH: usize = 32;

/// The slice of the operation a condition tree may look at.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    /// Operator of the operation under review.
    pub operator: &'a Address,
    /// Opcode of the operation under review.
    pub opcode: Opcode,
}

/// Validate a tree: root and children in range, no cycles, bounded depth.
pub fn validate_tree(tree: &ConditionTree) -> EngineResult<()> {
    if tree.nodes.is_empty() {
        return Err(EngineError::MalformedConditionTree(
            "empty node arena".to_string(),
        ));
    }
    if tree.root >= tree.nodes.len() {
        return Err(EngineError::MalformedConditionTree(format!(
            "root {} out of range",
            tree.root
        )));
    }
    let mut on_path = HashSet::new();
    walk(tree, tree.root, &mut on_path, 0, &mut |_| Ok(()))?;
    Ok(())
}

/// Evaluate a tree against the given context.
///
/// Logical nodes fold over their children: `And` of no children is true,
/// `Or` of no children is false. Short-circuiting is safe because conditions
/// have no side effects.
pub fn evaluate(tree: &ConditionTree, ctx: &CheckContext<'_>) -> EngineResult<bool> {
    if tree.nodes.is_empty() || tree.root >= tree.nodes.len() {
        return Err(EngineError::MalformedConditionTree(
            "invalid root node".to_string(),
        ));
    }
    let mut on_path = HashSet::new();
    eval_node(tree, tree.root, ctx, &mut on_path, 0)
}

fn eval_node(
    tree: &ConditionTree,
    id: NodeId,
    ctx: &CheckContext<'_>,
    on_path: &mut HashSet<NodeId>,
    depth: usize,
) -> EngineResult<bool> {
    check_node(tree, id, on_path, depth)?;
    on_path.insert(id);
    let result = match &tree.nodes[id] {
        ConditionNode::LiteralTrue => Ok(true),
        ConditionNode::Comparison(cmp) => Ok(compare(cmp, ctx)),
        ConditionNode::And(children) => {
            let mut all = true;
            for &child in children {
                if !eval_node(tree, child, ctx, on_path, depth + 1)? {
                    all = false;
                    break;
                }
            }
            Ok(all)
        }
        ConditionNode::Or(children) => {
            let mut any = false;
            for &child in children {
                if eval_node(tree, child, ctx, on_path, depth + 1)? {
                    any = true;
                    break;
                }
            }
            Ok(any)
        }
        ConditionNode::Not(child) => Ok(!eval_node(tree, *child, ctx, on_path, depth + 1)?),
    };
    on_path.remove(&id);
    result
}

fn compare(cmp: &Comparison, ctx: &CheckContext<'_>) -> bool {
    match cmp {
        Comparison::OperatorEquals(addr) => ctx.operator == addr,
        Comparison::OperatorInList(addrs) => addrs.contains(ctx.operator),
        Comparison::OpcodeEquals(opcode) => ctx.opcode == *opcode,
        Comparison::OpcodeInList(opcodes) => opcodes.contains(&ctx.opcode),
    }
}

/// Shared traversal used by validation; visits every reachable node.
fn walk(
    tree: &ConditionTree,
    id: NodeId,
    on_path: &mut HashSet<NodeId>,
    depth: usize,
    visit: &mut impl FnMut(NodeId) -> EngineResult<()>,
) -> EngineResult<()> {
    check_node(tree, id, on_path, depth)?;
    visit(id)?;
    on_path.insert(id);
    for &child in tree.children(id) {
        walk(tree, child, on_path, depth + 1, visit)?;
    }
    on_path.remove(&id);
    Ok(())
}

fn check_node(
    tree: &ConditionTree,
    id: NodeId,
    on_path: &HashSet<NodeId>,
    depth: usize,
) -> EngineResult<()> {
    if depth > MAX_CONDITION_DEPTH {
        return Err(EngineError::ConditionTreeTooDeep(MAX_CONDITION_DEPTH));
    }
    if id >= tree.nodes.len() {
        return Err(EngineError::MalformedConditionTree(format!(
            "child {} out of range",
            id
        )));
    }
    if on_path.contains(&id) {
        return Err(EngineError::MalformedConditionTree(format!(
            "cycle through node {}",
            id
        )));
    }
    Ok(())
}
