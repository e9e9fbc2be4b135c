//! Plugins: pluggable operation guards
//!
//! A plugin is evaluated before or after an operation and, when its condition
//! tree fires, contributes a verdict to the gate. Verdicts merge by precedence:
//! a rejection anywhere wins over a voting demand, which wins over sandboxing,
//! which wins over a plain pass.

use serde::{Deserialize, Serialize};

use crate::condition::ConditionTree;

/// Verdict a plugin contributes when its condition fires.
///
/// Variants are ordered by precedence so that the merged verdict of a gate is
/// simply the maximum of the fired verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PluginVerdict {
    /// Let the operation through.
    Pass,
    /// Run the operation in a sandboxed trial.
    SandboxNeeded,
    /// Put the operation (and the rest of its program) to a vote.
    VotingNeeded,
    /// Abort the operation.
    Rejected,
}

impl Default for PluginVerdict {
    fn default() -> Self {
        Self::Pass
    }
}

/// Which side of the operation a gate runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateHook {
    /// Before the operation is dispatched.
    Before,
    /// After the operation is dispatched.
    After,
}

/// A registered operation guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    /// Verdict contributed when the condition tree fires.
    pub verdict: PluginVerdict,
    /// Evaluation priority; lower levels are evaluated first, ties broken by
    /// insertion order.
    pub level: u8,
    /// Voting rule applied when this plugin demands a vote.
    pub voting_rule_index: u64,
    /// Free-form notes.
    pub notes: String,
    /// Disabled plugins are skipped without evaluating their condition.
    pub enabled: bool,
    /// Uninitialized plugins are likewise skipped.
    pub initialized: bool,
    /// `true` registers the plugin on the before-operation list.
    pub is_before_operation: bool,
    /// Guard expression over the operation context.
    pub condition_tree: ConditionTree,
}

impl Plugin {
    /// A plugin that fires unconditionally.
    pub fn unconditional(
        verdict: PluginVerdict,
        level: u8,
        voting_rule_index: u64,
        is_before_operation: bool,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            verdict,
            level,
            voting_rule_index,
            notes: notes.into(),
            enabled: true,
            initialized: true,
            is_before_operation,
            condition_tree: ConditionTree::literal_true(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_precedence_is_total() {
        assert!(PluginVerdict::Rejected > PluginVerdict::VotingNeeded);
        assert!(PluginVerdict::VotingNeeded > PluginVerdict::SandboxNeeded);
        assert!(PluginVerdict::SandboxNeeded > PluginVerdict::Pass);
    }
}
