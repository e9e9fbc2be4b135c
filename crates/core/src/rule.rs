//! Voting rules
//!
//! A voting rule names the token classes whose holders may vote, the approval
//! threshold, and how long the voting and execution-pending windows stay open.

use serde::{Deserialize, Serialize};

use crate::ClassId;

/// A quorum/threshold configuration referenced by plugins and voting items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingRule {
    /// Token classes whose holders are eligible to vote under this rule.
    pub voting_token_classes: Vec<ClassId>,
    /// Approval threshold in percent (0..=100).
    pub approval_threshold_percentage: u8,
    /// How long voting stays open, in seconds.
    pub voting_duration_secs: u64,
    /// How long an approved item may still be executed, in seconds.
    pub execution_pending_duration_secs: u64,
    /// Disabled rules cannot be referenced.
    pub enabled: bool,
    /// Free-form notes.
    pub notes: String,
    /// Absolute majority evaluates the threshold against total eligible power;
    /// otherwise against the power of voters who participated so far.
    pub is_absolute_majority: bool,
}
