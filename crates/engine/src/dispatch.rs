//! Opcode dispatcher
//!
//! Maps an operation's payload to a state-mutating handler. Every handler
//! validates first and mutates second, so a failing operation leaves no
//! partial state behind; earlier operations of the same program that already
//! committed are not rolled back.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use agora_core::{
    Address, BurnSpec, ClassId, MintSpec, Operation, OperationPayload, Plugin, TokenClassSpec,
    TransferSpec, VotingRule,
};
use agora_ledger::{LedgerError, TokenLedger};

use crate::condition::validate_tree;
use crate::error::{EngineError, EngineResult};
use crate::machine::{EngineState, GovernanceMachine};

impl<L: TokenLedger> GovernanceMachine<L> {
    /// Dispatch one state-mutating operation. Control opcodes (vote,
    /// execute-pending) are routed by the state machine, not here.
    pub(crate) async fn dispatch_state_op(
        &self,
        state: &mut EngineState,
        operation: &Operation,
    ) -> EngineResult<()> {
        match &operation.payload {
            OperationPayload::CreateTokenClasses(specs) => self.create_token_classes(specs).await,
            OperationPayload::MintTokens(specs) => self.mint_tokens(specs).await,
            OperationPayload::TransferTokens(specs) => self.transfer_tokens(specs).await,
            OperationPayload::BurnTokens(specs) => self.burn_tokens(specs).await,
            OperationPayload::AddVotingRules(rules) => add_voting_rules(state, rules),
            OperationPayload::AddPlugins(plugins) => add_plugins(state, plugins),
            OperationPayload::Vote { .. } | OperationPayload::ExecutePendingProgram => {
                Err(EngineError::MalformedOperationParam(
                    "control opcode is not a state operation".to_string(),
                ))
            }
        }
    }

    async fn create_token_classes(&self, specs: &[TokenClassSpec]) -> EngineResult<()> {
        require_non_empty(specs, "create token classes")?;
        let mut seen = HashSet::new();
        for spec in specs {
            if !seen.insert(spec.class_id) {
                return Err(EngineError::MalformedOperationParam(format!(
                    "duplicate class id {} in batch",
                    spec.class_id
                )));
            }
            if self.ledger().class_exists(spec.class_id).await {
                return Err(LedgerError::ClassAlreadyExists(spec.class_id).into());
            }
        }
        for spec in specs {
            self.ledger()
                .create_class(
                    spec.class_id,
                    &spec.name,
                    spec.voting_weight,
                    spec.dividend_weight,
                )
                .await?;
        }
        debug!(count = specs.len(), "created token classes");
        Ok(())
    }

    async fn mint_tokens(&self, specs: &[MintSpec]) -> EngineResult<()> {
        require_non_empty(specs, "mint tokens")?;
        for spec in specs {
            if spec.amount == 0 {
                return Err(EngineError::MalformedOperationParam(
                    "mint amount must be positive".to_string(),
                ));
            }
            if !self.ledger().class_exists(spec.class_id).await {
                return Err(LedgerError::UnknownTokenClass(spec.class_id).into());
            }
        }
        for spec in specs {
            self.ledger()
                .mint(&spec.recipient, spec.class_id, spec.amount)
                .await?;
        }
        debug!(count = specs.len(), "minted tokens");
        Ok(())
    }

    async fn transfer_tokens(&self, specs: &[TransferSpec]) -> EngineResult<()> {
        require_non_empty(specs, "transfer tokens")?;
        // Outgoing totals are checked against current balances before anything
        // moves, so the batch applies fully or not at all.
        let mut outgoing: HashMap<(ClassId, &Address), u128> = HashMap::new();
        for spec in specs {
            if spec.amount == 0 {
                return Err(EngineError::MalformedOperationParam(
                    "transfer amount must be positive".to_string(),
                ));
            }
            if !self.ledger().class_exists(spec.class_id).await {
                return Err(LedgerError::UnknownTokenClass(spec.class_id).into());
            }
            *outgoing.entry((spec.class_id, &spec.from)).or_insert(0) += spec.amount;
        }
        for ((class_id, from), needed) in &outgoing {
            let held = self.ledger().balance_of(from, *class_id).await?;
            if held < *needed {
                return Err(LedgerError::InsufficientBalance {
                    address: (*from).clone(),
                    class_id: *class_id,
                    held,
                    needed: *needed,
                }
                .into());
            }
        }
        for spec in specs {
            self.ledger()
                .transfer(&spec.from, &spec.to, spec.class_id, spec.amount)
                .await?;
        }
        debug!(count = specs.len(), "transferred tokens");
        Ok(())
    }

    async fn burn_tokens(&self, specs: &[BurnSpec]) -> EngineResult<()> {
        require_non_empty(specs, "burn tokens")?;
        let mut outgoing: HashMap<(ClassId, &Address), u128> = HashMap::new();
        for spec in specs {
            if spec.amount == 0 {
                return Err(EngineError::MalformedOperationParam(
                    "burn amount must be positive".to_string(),
                ));
            }
            if !self.ledger().class_exists(spec.class_id).await {
                return Err(LedgerError::UnknownTokenClass(spec.class_id).into());
            }
            *outgoing.entry((spec.class_id, &spec.holder)).or_insert(0) += spec.amount;
        }
        for ((class_id, holder), needed) in &outgoing {
            let held = self.ledger().balance_of(holder, *class_id).await?;
            if held < *needed {
                return Err(LedgerError::InsufficientBalance {
                    address: (*holder).clone(),
                    class_id: *class_id,
                    held,
                    needed: *needed,
                }
                .into());
            }
        }
        for spec in specs {
            self.ledger()
                .burn(&spec.holder, spec.class_id, spec.amount)
                .await?;
        }
        debug!(count = specs.len(), "burned tokens");
        Ok(())
    }
}

fn add_voting_rules(state: &mut EngineState, rules: &[VotingRule]) -> EngineResult<()> {
    require_non_empty(rules, "add voting rules")?;
    for rule in rules {
        if rule.approval_threshold_percentage > 100 {
            return Err(EngineError::MalformedOperationParam(format!(
                "approval threshold {} exceeds 100",
                rule.approval_threshold_percentage
            )));
        }
        if rule.voting_duration_secs == 0 || rule.execution_pending_duration_secs == 0 {
            return Err(EngineError::MalformedOperationParam(
                "voting and execution-pending durations must be positive".to_string(),
            ));
        }
        if rule.voting_token_classes.is_empty() {
            return Err(EngineError::MalformedOperationParam(
                "voting rule names no token classes".to_string(),
            ));
        }
    }
    state.rules.extend(rules.iter().cloned());
    debug!(count = rules.len(), total = state.rules.len(), "added voting rules");
    Ok(())
}

fn add_plugins(state: &mut EngineState, plugins: &[Plugin]) -> EngineResult<()> {
    require_non_empty(plugins, "add plugins")?;
    // Validate every tree before registering any, so a bad batch is a no-op.
    for plugin in plugins {
        validate_tree(&plugin.condition_tree)?;
    }
    for plugin in plugins {
        state.plugins.register(plugin.clone())?;
    }
    debug!(count = plugins.len(), "added plugins");
    Ok(())
}

fn require_non_empty<T>(specs: &[T], what: &str) -> EngineResult<()> {
    if specs.is_empty() {
        return Err(EngineError::MalformedOperationParam(format!(
            "{} batch is empty",
            what
        )));
    }
    Ok(())
}
