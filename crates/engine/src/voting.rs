//! Voting item store
//!
//! Tracks in-flight proposals: at most one item is ongoing at a time, items
//! are numbered from 1, and expiry is applied lazily when an item is touched
//! rather than by a background timer. The store is pure bookkeeping; voter
//! power is computed by the rule engine and handed in.

use std::collections::HashMap;

use tracing::{debug, info};

use agora_core::{Address, Operation, VotingItem, VotingRule, VotingStatus};

use crate::error::{EngineError, EngineResult};
use crate::rules::threshold_met;

/// Result of a successfully recorded vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Vote recorded; the item remains open.
    Ongoing,
    /// The vote satisfied the threshold; the item is approved.
    Approved,
}

/// Store of voting items, keyed by a monotonically increasing index.
#[derive(Debug, Default)]
pub struct VotingItemStore {
    items: HashMap<u64, VotingItem>,
    latest_index: u64,
    /// Index of the item currently collecting votes, if any.
    ongoing: Option<u64>,
    /// Index of the approved item awaiting execution, if any.
    pending_execution: Option<u64>,
}

impl VotingItemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the most recently opened item; 0 if none was ever opened.
    pub fn latest_index(&self) -> u64 {
        self.latest_index
    }

    /// Look up an item by index.
    pub fn get(&self, index: u64) -> Option<&VotingItem> {
        self.items.get(&index)
    }

    /// Index of the ongoing item, if any.
    pub fn ongoing_index(&self) -> Option<u64> {
        self.ongoing
    }

    /// Index of the approved item awaiting execution, if any.
    pub fn pending_execution_index(&self) -> Option<u64> {
        self.pending_execution
    }

    /// Open a voting item for a deferred operation batch.
    ///
    /// `total_power` is the per-class eligible power at this moment; it is
    /// frozen on the item so later mints cannot move an in-flight threshold.
    pub fn open(
        &mut self,
        voting_rule_index: u64,
        rule: &VotingRule,
        total_power: Vec<u128>,
        pending_operations: Vec<Operation>,
        now: u64,
    ) -> EngineResult<u64> {
        if self.ongoing.is_some() || self.pending_execution.is_some() {
            return Err(EngineError::VotingAlreadyInProgress);
        }
        let classes = rule.voting_token_classes.len();
        self.latest_index += 1;
        let index = self.latest_index;
        self.items.insert(
            index,
            VotingItem {
                voting_rule_index,
                status: VotingStatus::OnGoing,
                power_yes: vec![0; classes],
                power_voted: vec![0; classes],
                total_power,
                voters: Default::default(),
                started_at: now,
                voting_deadline: now + rule.voting_duration_secs,
                execution_deadline: None,
                executed: false,
                pending_operations,
            },
        );
        self.ongoing = Some(index);
        info!(index, voting_rule_index, "opened voting item");
        Ok(index)
    }

    /// Record a vote with the given per-class power.
    ///
    /// "No" votes count toward participation but never toward yes-power. A
    /// vote that satisfies the rule's threshold flips the item to Approved
    /// and stamps the execution deadline.
    pub fn cast_vote(
        &mut self,
        index: u64,
        voter: &Address,
        approve: bool,
        power: Vec<u128>,
        rule: &VotingRule,
        now: u64,
    ) -> EngineResult<VoteOutcome> {
        let item = self
            .items
            .get_mut(&index)
            .ok_or(EngineError::UnknownVotingItem(index))?;
        if item.status != VotingStatus::OnGoing || now > item.voting_deadline {
            return Err(EngineError::VotingClosed);
        }
        if item.voters.contains(voter) {
            return Err(EngineError::AlreadyVoted(voter.clone()));
        }

        item.voters.insert(voter.clone());
        for (i, p) in power.iter().enumerate() {
            item.power_voted[i] += p;
            if approve {
                item.power_yes[i] += p;
            }
        }
        debug!(index, %voter, approve, "vote recorded");

        if threshold_met(rule, item) {
            item.status = VotingStatus::Approved;
            item.execution_deadline = Some(now + rule.execution_pending_duration_secs);
            self.ongoing = None;
            self.pending_execution = Some(index);
            info!(index, "voting item approved");
            return Ok(VoteOutcome::Approved);
        }
        Ok(VoteOutcome::Ongoing)
    }

    /// Expire the ongoing item if its voting deadline has passed.
    /// Returns `true` if an item was expired.
    pub fn expire_ongoing(&mut self, now: u64) -> bool {
        if let Some(item) = self.ongoing.and_then(|i| self.items.get_mut(&i)) {
            if now > item.voting_deadline {
                item.status = VotingStatus::Expired;
                item.pending_operations.clear();
                let index = self.ongoing.take();
                info!(?index, "voting item expired");
                return true;
            }
        }
        false
    }

    /// Discard the pending operations of the approved item if its execution
    /// window has elapsed. Returns `true` if the item lapsed.
    pub fn lapse_execution(&mut self, now: u64) -> bool {
        if let Some(item) = self.pending_execution.and_then(|i| self.items.get_mut(&i)) {
            if item.execution_deadline.is_some_and(|deadline| now > deadline) {
                item.status = VotingStatus::Expired;
                item.pending_operations.clear();
                let index = self.pending_execution.take();
                info!(?index, "execution window lapsed; pending operations discarded");
                return true;
            }
        }
        false
    }

    /// Discard the rest of the approved item's operations after a failed
    /// execution attempt. The item closes; the committed head of the batch
    /// stays committed and is never re-applied.
    pub fn abort_execution(&mut self, index: u64) {
        if self.pending_execution == Some(index) {
            if let Some(item) = self.items.get_mut(&index) {
                item.status = VotingStatus::Expired;
                item.pending_operations.clear();
            }
            self.pending_execution = None;
            info!(index, "pending execution aborted; remaining operations discarded");
        }
    }

    /// Mark the approved item as executed and release the pending slot.
    pub fn mark_executed(&mut self, index: u64) {
        if let Some(item) = self.items.get_mut(&index) {
            item.executed = true;
        }
        if self.pending_execution == Some(index) {
            self.pending_execution = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> VotingRule {
        VotingRule {
            voting_token_classes: vec![1, 2],
            approval_threshold_percentage: 51,
            voting_duration_secs: 1000,
            execution_pending_duration_secs: 1000,
            enabled: true,
            notes: String::new(),
            is_absolute_majority: true,
        }
    }

    fn open_item(store: &mut VotingItemStore) -> u64 {
        store
            .open(0, &rule(), vec![16, 15], vec![], 0)
            .unwrap()
    }

    #[test]
    fn indices_start_at_one() {
        let mut store = VotingItemStore::new();
        assert_eq!(store.latest_index(), 0);
        let index = open_item(&mut store);
        assert_eq!(index, 1);
        assert_eq!(store.latest_index(), 1);
        assert_eq!(store.ongoing_index(), Some(1));
    }

    #[test]
    fn only_one_item_at_a_time() {
        let mut store = VotingItemStore::new();
        open_item(&mut store);
        let err = store.open(0, &rule(), vec![16, 15], vec![], 0).unwrap_err();
        assert!(matches!(err, EngineError::VotingAlreadyInProgress));
    }

    #[test]
    fn second_vote_by_same_voter_is_rejected() {
        let mut store = VotingItemStore::new();
        let index = open_item(&mut store);
        let voter = "alice".to_string();
        store.cast_vote(index, &voter, true, vec![1, 0], &rule(), 10).unwrap();
        let err = store
            .cast_vote(index, &voter, false, vec![1, 0], &rule(), 11)
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyVoted(_)));
    }

    #[test]
    fn no_votes_count_toward_participation_only() {
        let mut store = VotingItemStore::new();
        let index = open_item(&mut store);
        store
            .cast_vote(index, &"bob".to_string(), false, vec![4, 5], &rule(), 10)
            .unwrap();
        let item = store.get(index).unwrap();
        assert_eq!(item.power_yes, vec![0, 0]);
        assert_eq!(item.power_voted, vec![4, 5]);
    }

    #[test]
    fn threshold_vote_approves_and_stamps_deadline() {
        let mut store = VotingItemStore::new();
        let index = open_item(&mut store);
        // 16 of 31 is 51.6%: approved.
        let outcome = store
            .cast_vote(index, &"alice".to_string(), true, vec![16, 0], &rule(), 10)
            .unwrap();
        assert_eq!(outcome, VoteOutcome::Approved);
        let item = store.get(index).unwrap();
        assert_eq!(item.status, VotingStatus::Approved);
        assert_eq!(item.execution_deadline, Some(1010));
        assert_eq!(store.ongoing_index(), None);
        assert_eq!(store.pending_execution_index(), Some(index));
    }

    #[test]
    fn vote_after_deadline_is_closed() {
        let mut store = VotingItemStore::new();
        let index = open_item(&mut store);
        let err = store
            .cast_vote(index, &"alice".to_string(), true, vec![16, 0], &rule(), 1001)
            .unwrap_err();
        assert!(matches!(err, EngineError::VotingClosed));
    }

    #[test]
    fn expiry_is_monotonic() {
        let mut store = VotingItemStore::new();
        let index = open_item(&mut store);
        assert!(!store.expire_ongoing(1000));
        assert!(store.expire_ongoing(1001));
        assert_eq!(store.get(index).unwrap().status, VotingStatus::Expired);
        // No vote can reopen it.
        let err = store
            .cast_vote(index, &"alice".to_string(), true, vec![16, 0], &rule(), 500)
            .unwrap_err();
        assert!(matches!(err, EngineError::VotingClosed));
    }

    #[test]
    fn lapse_discards_pending_operations() {
        let mut store = VotingItemStore::new();
        let index = store
            .open(
                0,
                &rule(),
                vec![16, 15],
                vec![agora_core::Operation::new(
                    "alice",
                    agora_core::OperationPayload::MintTokens(vec![]),
                )],
                0,
            )
            .unwrap();
        store
            .cast_vote(index, &"alice".to_string(), true, vec![16, 0], &rule(), 10)
            .unwrap();
        assert!(!store.lapse_execution(1010));
        assert!(store.lapse_execution(1011));
        let item = store.get(index).unwrap();
        assert_eq!(item.status, VotingStatus::Expired);
        assert!(item.pending_operations.is_empty());
        assert_eq!(store.pending_execution_index(), None);
    }

    #[test]
    fn abort_closes_the_item_and_releases_the_slot() {
        let mut store = VotingItemStore::new();
        let index = store
            .open(
                0,
                &rule(),
                vec![16, 15],
                vec![agora_core::Operation::new(
                    "alice",
                    agora_core::OperationPayload::MintTokens(vec![]),
                )],
                0,
            )
            .unwrap();
        store
            .cast_vote(index, &"alice".to_string(), true, vec![16, 0], &rule(), 10)
            .unwrap();
        store.abort_execution(index);

        let item = store.get(index).unwrap();
        assert_eq!(item.status, VotingStatus::Expired);
        assert!(!item.executed);
        assert!(item.pending_operations.is_empty());
        assert_eq!(store.pending_execution_index(), None);
    }
}
