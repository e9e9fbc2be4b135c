//! Execution pipeline and voting subsystem for Agora
//!
//! This crate is the core of the governance engine: programs of opcode-tagged
//! operations enter the [`GovernanceMachine`], pass through the plugin gates,
//! and either execute immediately against the token ledger or get deferred
//! into a voting item governed by a multi-class weighted voting rule. The
//! machine sequences IDLE → VOTING → EXECUTING_PENDING → IDLE; deferral is
//! protocol-level (pending operations stored as data), so the approved batch
//! can be executed later by a different caller.

pub mod condition;
mod dispatch;
pub mod error;
pub mod gate;
pub mod machine;
pub mod rules;
pub mod voting;

pub use condition::{evaluate, validate_tree, CheckContext, MAX_CONDITION_DEPTH};
pub use error::{EngineError, EngineResult};
pub use gate::{GateOutcome, PluginRegistry};
pub use machine::{GovernanceMachine, ProgramOutcome};
pub use voting::{VoteOutcome, VotingItemStore};
