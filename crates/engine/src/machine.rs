//! Governance state machine
//!
//! Top-level controller sequencing IDLE → VOTING → EXECUTING_PENDING → IDLE.
//! A submitted program runs operation by operation through the plugin gates
//! and the dispatcher; a voting demand defers the current operation and the
//! rest of the program into a voting item. The machine owns all mutable
//! state behind one write lock, so programs are processed strictly one at a
//! time and votes apply in arrival order.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use agora_core::{
    Address, Clock, GateHook, GovernancePhase, Opcode, Operation, OperationPayload, Plugin,
    Program, SystemClock, VotingItem, VotingRule,
};
use agora_ledger::TokenLedger;

use crate::error::{EngineError, EngineResult};
use crate::gate::PluginRegistry;
use crate::rules;
use crate::voting::{VoteOutcome, VotingItemStore};

/// Result of submitting a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramOutcome {
    /// Phase after the program was processed.
    pub phase: GovernancePhase,
    /// Operations that committed immediately (deferred operations excluded).
    pub committed_operations: usize,
    /// Voting item opened by this program, if it was gated to a vote.
    pub voting_item_index: Option<u64>,
}

/// Mutable organizational state owned by the machine.
pub(crate) struct EngineState {
    pub(crate) phase: GovernancePhase,
    pub(crate) plugins: PluginRegistry,
    pub(crate) rules: Vec<VotingRule>,
    pub(crate) voting: VotingItemStore,
}

/// The governance engine: sole entry point for program submission and the
/// owner of plugins, rules, voting items and the governance phase.
pub struct GovernanceMachine<L: TokenLedger> {
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
    inner: RwLock<EngineState>,
}

impl<L: TokenLedger> GovernanceMachine<L> {
    /// Create a machine over the given ledger, using the system clock.
    pub fn new(ledger: Arc<L>) -> Self {
        Self::with_clock(ledger, Arc::new(SystemClock))
    }

    /// Create a machine with an explicit clock (tests pin time with a
    /// [`agora_core::ManualClock`]).
    pub fn with_clock(ledger: Arc<L>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            clock,
            inner: RwLock::new(EngineState {
                phase: GovernancePhase::Idle,
                plugins: PluginRegistry::new(),
                rules: Vec::new(),
                voting: VotingItemStore::new(),
            }),
        }
    }

    pub(crate) fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Submit a program through the plugin gates.
    ///
    /// Operations execute strictly in order. An operation gated to a vote
    /// defers itself and the remaining tail of the program as one pending
    /// unit; earlier operations stay committed.
    pub async fn execute_program(&self, program: &Program) -> EngineResult<ProgramOutcome> {
        self.run_program(program, true).await
    }

    /// Submit a program bypassing the plugin gates (bootstrap path: install
    /// the first plugins and rules before any gate exists). Payload
    /// validation and phase rules still apply.
    pub async fn execute_program_ungated(&self, program: &Program) -> EngineResult<ProgramOutcome> {
        self.run_program(program, false).await
    }

    async fn run_program(&self, program: &Program, gated: bool) -> EngineResult<ProgramOutcome> {
        let mut state = self.inner.write().await;
        let now = self.clock.now();
        Self::refresh_phase(&mut state, now);
        debug!(operator = %program.operator, notes = %program.notes, phase = ?state.phase, "program submitted");

        let mut outcome = ProgramOutcome {
            phase: state.phase,
            committed_operations: 0,
            voting_item_index: None,
        };

        for (i, operation) in program.operations.iter().enumerate() {
            match operation.opcode() {
                Opcode::Vote => {
                    if state.phase != GovernancePhase::Voting {
                        return Err(EngineError::VotingClosed);
                    }
                    self.handle_vote(&mut state, operation, now).await?;
                    outcome.committed_operations += 1;
                }
                Opcode::ExecutePendingProgram => {
                    if state.phase != GovernancePhase::ExecutingPending {
                        return Err(EngineError::ExecutionWindowExpired);
                    }
                    self.handle_execute_pending(&mut state, now).await?;
                    outcome.committed_operations += 1;
                }
                _ => {
                    if state.phase != GovernancePhase::Idle {
                        return Err(EngineError::GovernanceBusy(state.phase));
                    }
                    if gated {
                        if let Some(rule_index) =
                            self.check_gates(&state, operation)?
                        {
                            let index = self
                                .defer_to_voting(
                                    &mut state,
                                    rule_index,
                                    program.operations[i..].to_vec(),
                                    now,
                                )
                                .await?;
                            outcome.voting_item_index = Some(index);
                            break;
                        }
                    }
                    self.dispatch_state_op(&mut state, operation).await?;
                    outcome.committed_operations += 1;
                }
            }
        }

        outcome.phase = state.phase;
        Ok(outcome)
    }

    /// Run both gates for one operation. Returns the voting rule index to
    /// defer under, or `None` if the operation may execute now.
    ///
    /// Condition trees are referentially transparent, so consulting both
    /// hooks before committing produces the same verdicts as interleaving
    /// them around a trial run; a sandbox demand collapses to immediate
    /// execution.
    fn check_gates(
        &self,
        state: &EngineState,
        operation: &Operation,
    ) -> EngineResult<Option<u64>> {
        let before = state.plugins.run_gate(GateHook::Before, operation)?;
        if before.verdict == agora_core::PluginVerdict::Rejected {
            warn!(opcode = ?operation.opcode(), "operation rejected by before-operation gate");
            return Err(EngineError::OperationRejected);
        }
        let after = state.plugins.run_gate(GateHook::After, operation)?;
        if after.verdict == agora_core::PluginVerdict::Rejected {
            warn!(opcode = ?operation.opcode(), "operation rejected by after-operation gate");
            return Err(EngineError::OperationRejected);
        }
        // The before hook runs first, so its voting demand names the rule.
        Ok(before
            .voting_rule_index
            .or(after.voting_rule_index))
    }

    async fn defer_to_voting(
        &self,
        state: &mut EngineState,
        rule_index: u64,
        pending: Vec<Operation>,
        now: u64,
    ) -> EngineResult<u64> {
        let rule = rules::get_rule(&state.rules, rule_index)?.clone();
        let total_power = rules::total_power(&rule, self.ledger()).await?;
        let index = state
            .voting
            .open(rule_index, &rule, total_power, pending, now)?;
        state.phase = GovernancePhase::Voting;
        info!(index, rule_index, "program deferred to voting");
        Ok(index)
    }

    async fn handle_vote(
        &self,
        state: &mut EngineState,
        operation: &Operation,
        now: u64,
    ) -> EngineResult<()> {
        let approve = match operation.payload {
            OperationPayload::Vote { approve } => approve,
            _ => {
                return Err(EngineError::MalformedOperationParam(
                    "vote opcode without vote payload".to_string(),
                ))
            }
        };
        let index = state
            .voting
            .ongoing_index()
            .ok_or(EngineError::VotingClosed)?;
        let rule_index = state
            .voting
            .get(index)
            .ok_or(EngineError::UnknownVotingItem(index))?
            .voting_rule_index;
        let rule = rules::get_rule(&state.rules, rule_index)?.clone();
        let power = rules::voter_power(&rule, &operation.operator, self.ledger()).await?;

        match state
            .voting
            .cast_vote(index, &operation.operator, approve, power, &rule, now)?
        {
            VoteOutcome::Approved => {
                state.phase = GovernancePhase::ExecutingPending;
                info!(index, "threshold reached; awaiting pending execution");
            }
            VoteOutcome::Ongoing => {}
        }
        Ok(())
    }

    async fn handle_execute_pending(
        &self,
        state: &mut EngineState,
        now: u64,
    ) -> EngineResult<()> {
        let index = state
            .voting
            .pending_execution_index()
            .ok_or(EngineError::ExecutionWindowExpired)?;
        if state.voting.lapse_execution(now) {
            state.phase = GovernancePhase::Idle;
            return Err(EngineError::ExecutionWindowExpired);
        }
        let pending = state
            .voting
            .get(index)
            .map(|item| item.pending_operations.clone())
            .unwrap_or_default();

        // Execution is single-shot. Each operation is atomic on its own; a
        // mid-batch failure discards everything that has not run yet, so the
        // committed head can never be applied a second time.
        for operation in &pending {
            if let Err(err) = self.dispatch_state_op(state, operation).await {
                state.voting.abort_execution(index);
                state.phase = GovernancePhase::Idle;
                warn!(index, %err, "pending execution failed; remaining operations discarded");
                return Err(err);
            }
        }

        state.voting.mark_executed(index);
        state.phase = GovernancePhase::Idle;
        info!(index, operations = pending.len(), "pending program executed");
        Ok(())
    }

    /// Apply lazy expiry before routing: a voting deadline or execution
    /// window that elapsed since the last touch takes effect now.
    fn refresh_phase(state: &mut EngineState, now: u64) {
        match state.phase {
            GovernancePhase::Voting => {
                if state.voting.expire_ongoing(now) {
                    state.phase = GovernancePhase::Idle;
                }
            }
            GovernancePhase::ExecutingPending => {
                if state.voting.lapse_execution(now) {
                    state.phase = GovernancePhase::Idle;
                }
            }
            GovernancePhase::Idle => {}
        }
    }

    // --- Read-only accessors -------------------------------------------------

    /// Current governance phase.
    pub async fn phase(&self) -> GovernancePhase {
        self.inner.read().await.phase
    }

    /// Index of the most recently opened voting item; 0 if none.
    pub async fn latest_voting_item_index(&self) -> u64 {
        self.inner.read().await.voting.latest_index()
    }

    /// Snapshot of a voting item.
    pub async fn voting_item(&self, index: u64) -> Option<VotingItem> {
        self.inner.read().await.voting.get(index).cloned()
    }

    /// Snapshot of a voting rule.
    pub async fn voting_rule(&self, index: u64) -> Option<VotingRule> {
        self.inner.read().await.rules.get(index as usize).cloned()
    }

    /// Registered plugins for one hook, in insertion order.
    pub async fn plugins(&self, hook: GateHook) -> Vec<Plugin> {
        self.inner.read().await.plugins.plugins(hook).to_vec()
    }

    /// Per-class voting power of `address` under the given rule, as of the
    /// current ledger state.
    pub async fn voter_power_of_rule(
        &self,
        rule_index: u64,
        address: &Address,
    ) -> EngineResult<Vec<u128>> {
        let rule = {
            let state = self.inner.read().await;
            rules::get_rule(&state.rules, rule_index)?.clone()
        };
        rules::voter_power(&rule, address, self.ledger()).await
    }
}
