//! Plugin registry and operation gate
//!
//! Plugins live in two ordered lists (before-operation, after-operation) and
//! are consulted per operation in ascending `level` order, ties broken by
//! insertion order. Fired verdicts merge by precedence; disabled or
//! uninitialized plugins are skipped without evaluating their condition tree.
//! Gate runs are referentially transparent: same state, same operation, same
//! verdict.

use tracing::debug;

use agora_core::{GateHook, Operation, Plugin, PluginVerdict};

use crate::condition::{evaluate, validate_tree, CheckContext};
use crate::error::EngineResult;

/// Merged outcome of one gate run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    /// Highest-precedence verdict among the plugins that fired.
    pub verdict: PluginVerdict,
    /// Rule demanded by the first voting-needed plugin in evaluation order,
    /// if any fired.
    pub voting_rule_index: Option<u64>,
}

impl GateOutcome {
    fn pass() -> Self {
        Self {
            verdict: PluginVerdict::Pass,
            voting_rule_index: None,
        }
    }
}

/// Ordered before/after plugin lists.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    before: Vec<Plugin>,
    after: Vec<Plugin>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin on the list selected by its
    /// `is_before_operation` flag. The condition tree is validated here, once,
    /// rather than on every gate run.
    pub fn register(&mut self, plugin: Plugin) -> EngineResult<()> {
        validate_tree(&plugin.condition_tree)?;
        let list = if plugin.is_before_operation {
            &mut self.before
        } else {
            &mut self.after
        };
        list.push(plugin);
        Ok(())
    }

    /// Plugins registered for the given hook, in insertion order.
    pub fn plugins(&self, hook: GateHook) -> &[Plugin] {
        match hook {
            GateHook::Before => &self.before,
            GateHook::After => &self.after,
        }
    }

    /// Run the gate for one hook against an operation.
    ///
    /// Condition errors fail the gate closed: they surface to the caller and
    /// abort the operation instead of letting it through.
    pub fn run_gate(&self, hook: GateHook, operation: &Operation) -> EngineResult<GateOutcome> {
        let ctx = CheckContext {
            operator: &operation.operator,
            opcode: operation.opcode(),
        };

        // Stable sort keeps insertion order within a level.
        let list = self.plugins(hook);
        let mut order: Vec<usize> = (0..list.len()).collect();
        order.sort_by_key(|&i| list[i].level);

        let mut outcome = GateOutcome::pass();
        for i in order {
            let plugin = &list[i];
            if !plugin.enabled || !plugin.initialized {
                continue;
            }
            if !evaluate(&plugin.condition_tree, &ctx)? {
                continue;
            }
            debug!(
                hook = ?hook,
                level = plugin.level,
                verdict = ?plugin.verdict,
                "plugin fired"
            );
            if plugin.verdict == PluginVerdict::VotingNeeded && outcome.voting_rule_index.is_none() {
                outcome.voting_rule_index = Some(plugin.voting_rule_index);
            }
            outcome.verdict = outcome.verdict.max(plugin.verdict);
            if outcome.verdict == PluginVerdict::Rejected {
                // Nothing outranks a rejection; later plugins cannot change
                // the result.
                break;
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::{Comparison, ConditionTree, Opcode, OperationPayload};

    fn mint_op(operator: &str) -> Operation {
        Operation::new(operator, OperationPayload::MintTokens(vec![]))
    }

    fn plugin(verdict: PluginVerdict, level: u8) -> Plugin {
        Plugin::unconditional(verdict, level, 0, true, "test")
    }

    #[test]
    fn empty_gate_passes() {
        let registry = PluginRegistry::new();
        let outcome = registry.run_gate(GateHook::Before, &mint_op("alice")).unwrap();
        assert_eq!(outcome.verdict, PluginVerdict::Pass);
    }

    #[test]
    fn rejection_beats_voting_regardless_of_level() {
        let mut registry = PluginRegistry::new();
        registry.register(plugin(PluginVerdict::VotingNeeded, 1)).unwrap();
        registry.register(plugin(PluginVerdict::Rejected, 9)).unwrap();

        let outcome = registry.run_gate(GateHook::Before, &mint_op("alice")).unwrap();
        assert_eq!(outcome.verdict, PluginVerdict::Rejected);
    }

    #[test]
    fn voting_beats_pass_and_sandbox() {
        let mut registry = PluginRegistry::new();
        registry.register(plugin(PluginVerdict::Pass, 0)).unwrap();
        registry.register(plugin(PluginVerdict::SandboxNeeded, 1)).unwrap();
        registry
            .register(Plugin::unconditional(PluginVerdict::VotingNeeded, 2, 7, true, "vote"))
            .unwrap();

        let outcome = registry.run_gate(GateHook::Before, &mint_op("alice")).unwrap();
        assert_eq!(outcome.verdict, PluginVerdict::VotingNeeded);
        assert_eq!(outcome.voting_rule_index, Some(7));
    }

    #[test]
    fn lowest_level_voting_plugin_names_the_rule() {
        let mut registry = PluginRegistry::new();
        registry
            .register(Plugin::unconditional(PluginVerdict::VotingNeeded, 5, 11, true, "late"))
            .unwrap();
        registry
            .register(Plugin::unconditional(PluginVerdict::VotingNeeded, 1, 3, true, "early"))
            .unwrap();

        let outcome = registry.run_gate(GateHook::Before, &mint_op("alice")).unwrap();
        assert_eq!(outcome.voting_rule_index, Some(3));
    }

    #[test]
    fn disabled_and_uninitialized_plugins_are_skipped() {
        let mut registry = PluginRegistry::new();
        let mut disabled = plugin(PluginVerdict::Rejected, 0);
        disabled.enabled = false;
        let mut uninitialized = plugin(PluginVerdict::Rejected, 0);
        uninitialized.initialized = false;
        registry.register(disabled).unwrap();
        registry.register(uninitialized).unwrap();

        let outcome = registry.run_gate(GateHook::Before, &mint_op("alice")).unwrap();
        assert_eq!(outcome.verdict, PluginVerdict::Pass);
    }

    #[test]
    fn condition_selects_operations() {
        let mut registry = PluginRegistry::new();
        let mut reject_votes = plugin(PluginVerdict::Rejected, 0);
        reject_votes.condition_tree =
            ConditionTree::comparison(Comparison::OpcodeEquals(Opcode::MintTokens));
        registry.register(reject_votes).unwrap();

        let outcome = registry.run_gate(GateHook::Before, &mint_op("alice")).unwrap();
        assert_eq!(outcome.verdict, PluginVerdict::Rejected);

        let vote_op = Operation::new("alice", OperationPayload::Vote { approve: true });
        let outcome = registry.run_gate(GateHook::Before, &vote_op).unwrap();
        assert_eq!(outcome.verdict, PluginVerdict::Pass);
    }

    #[test]
    fn registration_rejects_malformed_trees() {
        let mut registry = PluginRegistry::new();
        let mut broken = plugin(PluginVerdict::Pass, 0);
        broken.condition_tree = ConditionTree::new(vec![agora_core::ConditionNode::Not(0)]);
        assert!(registry.register(broken).is_err());
        assert!(registry.plugins(GateHook::Before).is_empty());
    }

    #[test]
    fn before_and_after_lists_are_separate() {
        let mut registry = PluginRegistry::new();
        registry
            .register(Plugin::unconditional(PluginVerdict::Rejected, 0, 0, false, "after only"))
            .unwrap();

        let outcome = registry.run_gate(GateHook::Before, &mint_op("alice")).unwrap();
        assert_eq!(outcome.verdict, PluginVerdict::Pass);
        let outcome = registry.run_gate(GateHook::After, &mint_op("alice")).unwrap();
        assert_eq!(outcome.verdict, PluginVerdict::Rejected);
    }
}
