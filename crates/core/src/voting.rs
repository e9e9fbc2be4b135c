//! Voting items and the governance phase
//!
//! A voting item is one in-flight proposal: the operations deferred to a vote,
//! the per-class power tallies, and the deadlines governing it. At most one
//! item is ongoing at a time; the governance phase mirrors that item's state.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::program::Operation;
use crate::Address;

/// Status of a voting item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VotingStatus {
    /// Open for votes.
    OnGoing,
    /// Threshold reached; pending operations await execution.
    Approved,
    /// Voting concluded against the item.
    Rejected,
    /// Closed without executing: a voting or execution deadline elapsed, or
    /// pending execution failed.
    Expired,
}

impl Default for VotingStatus {
    fn default() -> Self {
        Self::OnGoing
    }
}

/// Phase of the governance state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GovernancePhase {
    /// No ongoing item; programs are admitted through the gates.
    Idle,
    /// An item is collecting votes; only vote operations are admitted.
    Voting,
    /// An item is approved; only execute-pending is admitted, until the
    /// execution window lapses.
    ExecutingPending,
}

impl Default for GovernancePhase {
    fn default() -> Self {
        Self::Idle
    }
}

/// One in-flight proposal created from a gated operation batch.
///
/// Power vectors are indexed in the order of the rule's
/// `voting_token_classes`. `total_power` is computed when the item opens and
/// frozen; later mints cannot retroactively move an in-flight threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingItem {
    /// Rule governing this item.
    pub voting_rule_index: u64,
    /// Current status.
    pub status: VotingStatus,
    /// Per-class yes-power accumulated so far.
    pub power_yes: Vec<u128>,
    /// Per-class power of all voters who participated (yes and no).
    pub power_voted: Vec<u128>,
    /// Per-class total eligible power, frozen at open time.
    pub total_power: Vec<u128>,
    /// Addresses that already voted.
    pub voters: HashSet<Address>,
    /// When the item opened, in seconds.
    pub started_at: u64,
    /// Last second at which votes are accepted.
    pub voting_deadline: u64,
    /// Last second at which the approved item may be executed; set on approval.
    pub execution_deadline: Option<u64>,
    /// Whether the pending operations have been executed.
    pub executed: bool,
    /// Operations to execute if the item is approved, in original order.
    pub pending_operations: Vec<Operation>,
}

impl VotingItem {
    /// Cumulative yes-power over all classes.
    pub fn total_power_yes(&self) -> u128 {
        self.power_yes.iter().sum()
    }

    /// Cumulative participated power over all classes.
    pub fn total_power_voted(&self) -> u128 {
        self.power_voted.iter().sum()
    }

    /// Cumulative eligible power over all classes.
    pub fn total_eligible_power(&self) -> u128 {
        self.total_power.iter().sum()
    }
}
