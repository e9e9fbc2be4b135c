//! Agora: a programmable governance engine
//!
//! Organizations on Agora are governed by programs: ordered batches of
//! opcode-tagged operations that mint, transfer and burn class-weighted
//! tokens, install voting rules, and register plugin guards. Every gated
//! program passes through condition-tree plugins that can wave it through,
//! reject it, or defer it into a weighted multi-class vote; approved programs
//! wait in an execution window until someone executes them.
//!
//! The facade re-exports the member crates:
//! - [`core`] (`agora-core`): the shared data model
//! - [`ledger`] (`agora-ledger`): the token ledger trait and in-memory backend
//! - [`engine`] (`agora-engine`): gates, voting and the governance machine
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use agora::engine::GovernanceMachine;
//! use agora::ledger::InMemoryTokenLedger;
//! use agora::core::{Operation, OperationPayload, Program, TokenClassSpec};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = Arc::new(InMemoryTokenLedger::new());
//! let machine = GovernanceMachine::new(ledger);
//!
//! let program = Program::new(
//!     "0xf39f",
//!     "bootstrap",
//!     vec![Operation::new(
//!         "0xf39f",
//!         OperationPayload::CreateTokenClasses(vec![TokenClassSpec {
//!             class_id: 0,
//!             name: "common".to_string(),
//!             voting_weight: 1,
//!             dividend_weight: 1,
//!         }]),
//!     )],
//! );
//! machine.execute_program_ungated(&program).await?;
//! # Ok(())
//! # }
//! ```

pub use agora_core as core;
pub use agora_engine as engine;
pub use agora_ledger as ledger;

pub use agora_core::{
    Address, ClassId, GovernancePhase, Opcode, Operation, OperationPayload, Plugin, PluginVerdict,
    Program, VotingRule,
};
pub use agora_engine::{EngineError, EngineResult, GovernanceMachine, ProgramOutcome};
pub use agora_ledger::{InMemoryTokenLedger, TokenLedger};
