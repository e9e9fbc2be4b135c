//! Core data model for the Agora governance engine
//!
//! This crate defines the shared types the engine operates on: programs of
//! opcode-tagged operations, condition trees, plugins, voting rules, voting
//! items and the governance phase. It carries no engine behavior; evaluation
//! and state transitions live in `agora-engine`.

pub mod condition;
pub mod plugin;
pub mod program;
pub mod rule;
pub mod time;
pub mod voting;

/// An account address, trusted as already authenticated by the transport layer.
pub type Address = String;

/// Identifier of a token class.
pub type ClassId = u64;

pub use condition::{Comparison, ConditionNode, ConditionTree, NodeId};
pub use plugin::{GateHook, Plugin, PluginVerdict};
pub use program::{
    BurnSpec, MintSpec, Opcode, Operation, OperationPayload, Program, TokenClassSpec, TransferSpec,
};
pub use rule::VotingRule;
pub use time::{Clock, ManualClock, SystemClock};
pub use voting::{GovernancePhase, VotingItem, VotingStatus};
