//! Error types for engine operations

use thiserror::Error;

use agora_core::{Address, GovernancePhase};
use agora_ledger::LedgerError;

/// Error types for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Opcode arguments failed shape validation; nothing was mutated
    #[error("Malformed operation param: {0}")]
    MalformedOperationParam(String),

    /// A condition tree references a missing child or contains a cycle
    #[error("Malformed condition tree: {0}")]
    MalformedConditionTree(String),

    /// A condition tree exceeds the evaluation depth guard
    #[error("Condition tree too deep: exceeded depth {0}")]
    ConditionTreeTooDeep(usize),

    /// Voting rule index out of range, or the rule is disabled
    #[error("Unknown voting rule: {0}")]
    UnknownVotingRule(u64),

    /// Voting item index does not exist
    #[error("Unknown voting item: {0}")]
    UnknownVotingItem(u64),

    /// Another voting item is still ongoing
    #[error("Voting already in progress")]
    VotingAlreadyInProgress,

    /// The voter already cast a vote on this item
    #[error("Already voted: {0}")]
    AlreadyVoted(Address),

    /// The item is not open for votes
    #[error("Voting closed")]
    VotingClosed,

    /// A program was submitted while the machine is not idle
    #[error("Governance busy: phase is {0:?}")]
    GovernanceBusy(GovernancePhase),

    /// The execution-pending window elapsed before execution
    #[error("Execution window expired")]
    ExecutionWindowExpired,

    /// A plugin rejected the operation
    #[error("Operation rejected by plugin gate")]
    OperationRejected,

    /// Error from the token ledger collaborator
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
