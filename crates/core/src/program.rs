//! Programs and operations
//!
//! A program is an ordered batch of operations submitted by an operator. Each
//! operation carries an explicit, typed payload rather than a catch-all
//! parameter bundle; the opcode is derived from the payload variant, so a
//! handler can never receive arguments of the wrong shape.

use serde::{Deserialize, Serialize};

use crate::plugin::Plugin;
use crate::rule::VotingRule;
use crate::{Address, ClassId};

/// Numeric opcode tags. The discriminants are part of the wire format and
/// must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Opcode {
    /// Mint tokens of existing classes to recipients.
    MintTokens = 1,
    /// Create new token classes with voting and dividend weights.
    CreateTokenClasses = 2,
    /// Transfer tokens between addresses.
    TransferTokens = 3,
    /// Burn tokens from holders.
    BurnTokens = 5,
    /// Register voting rules.
    AddVotingRules = 10,
    /// Register before/after-operation plugins.
    AddPlugins = 15,
    /// Cast a vote on the ongoing voting item.
    Vote = 32,
    /// Execute the pending operations of an approved voting item.
    ExecutePendingProgram = 33,
}

/// Specification for one token class to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClassSpec {
    /// Class identifier.
    pub class_id: ClassId,
    /// Human-readable class name.
    pub name: String,
    /// Voting power per token of this class.
    pub voting_weight: u64,
    /// Dividend share per token of this class.
    pub dividend_weight: u64,
}

/// One mint instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintSpec {
    /// Class to mint.
    pub class_id: ClassId,
    /// Amount to mint.
    pub amount: u128,
    /// Recipient of the minted tokens.
    pub recipient: Address,
}

/// One transfer instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSpec {
    /// Class to transfer.
    pub class_id: ClassId,
    /// Amount to transfer.
    pub amount: u128,
    /// Sending address.
    pub from: Address,
    /// Receiving address.
    pub to: Address,
}

/// One burn instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnSpec {
    /// Class to burn from.
    pub class_id: ClassId,
    /// Amount to burn.
    pub amount: u128,
    /// Holder whose balance is reduced.
    pub holder: Address,
}

/// Typed payload of an operation, one variant per opcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationPayload {
    /// Create token classes.
    CreateTokenClasses(Vec<TokenClassSpec>),
    /// Mint tokens.
    MintTokens(Vec<MintSpec>),
    /// Transfer tokens.
    TransferTokens(Vec<TransferSpec>),
    /// Burn tokens.
    BurnTokens(Vec<BurnSpec>),
    /// Register voting rules, appended to the rule list in order.
    AddVotingRules(Vec<VotingRule>),
    /// Register plugins; each plugin selects its hook via
    /// [`Plugin::is_before_operation`].
    AddPlugins(Vec<Plugin>),
    /// Vote on the ongoing voting item. The operator is the voter.
    Vote {
        /// Approval (`true`) or rejection (`false`).
        approve: bool,
    },
    /// Execute the pending operations of the approved voting item.
    ExecutePendingProgram,
}

impl OperationPayload {
    /// The opcode tag of this payload.
    pub fn opcode(&self) -> Opcode {
        match self {
            OperationPayload::CreateTokenClasses(_) => Opcode::CreateTokenClasses,
            OperationPayload::MintTokens(_) => Opcode::MintTokens,
            OperationPayload::TransferTokens(_) => Opcode::TransferTokens,
            OperationPayload::BurnTokens(_) => Opcode::BurnTokens,
            OperationPayload::AddVotingRules(_) => Opcode::AddVotingRules,
            OperationPayload::AddPlugins(_) => Opcode::AddPlugins,
            OperationPayload::Vote { .. } => Opcode::Vote,
            OperationPayload::ExecutePendingProgram => Opcode::ExecutePendingProgram,
        }
    }
}

/// A single operation: who performs it and what it does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Address performing the operation.
    pub operator: Address,
    /// Typed operation payload.
    pub payload: OperationPayload,
}

impl Operation {
    /// Convenience constructor.
    pub fn new(operator: impl Into<Address>, payload: OperationPayload) -> Self {
        Self {
            operator: operator.into(),
            payload,
        }
    }

    /// The opcode tag of this operation.
    pub fn opcode(&self) -> Opcode {
        self.payload.opcode()
    }
}

/// An ordered batch of operations submitted as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Address submitting the program.
    pub operator: Address,
    /// Free-form notes attached by the submitter.
    pub notes: String,
    /// Operations, executed strictly in order.
    pub operations: Vec<Operation>,
}

impl Program {
    /// Create a program from a list of operations.
    pub fn new(
        operator: impl Into<Address>,
        notes: impl Into<String>,
        operations: Vec<Operation>,
    ) -> Self {
        Self {
            operator: operator.into(),
            notes: notes.into(),
            operations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn payload_reports_wire_opcodes() {
        assert_eq!(
            OperationPayload::MintTokens(vec![]).opcode() as u32,
            1,
        );
        assert_eq!(
            OperationPayload::CreateTokenClasses(vec![]).opcode() as u32,
            2,
        );
        assert_eq!(OperationPayload::Vote { approve: true }.opcode() as u32, 32);
        assert_eq!(OperationPayload::ExecutePendingProgram.opcode() as u32, 33);
    }
}
