//! Voting rule engine
//!
//! Computes weighted voting power across the token classes a rule names and
//! decides whether a voting item has met its threshold. Power vectors are
//! indexed in the order of the rule's class list. Threshold arithmetic is
//! integer-only: `yes * 100 >= total * pct`.

use agora_core::{Address, VotingItem, VotingRule};
use agora_ledger::TokenLedger;

use crate::error::{EngineError, EngineResult};

/// Look up a rule by index; disabled rules are as unknown as missing ones.
pub fn get_rule(rules: &[VotingRule], index: u64) -> EngineResult<&VotingRule> {
    rules
        .get(index as usize)
        .filter(|rule| rule.enabled)
        .ok_or(EngineError::UnknownVotingRule(index))
}

/// Per-class power of `address` under `rule`: balance times class voting
/// weight, in the order of the rule's class list.
pub async fn voter_power<L: TokenLedger + ?Sized>(
    rule: &VotingRule,
    address: &Address,
    ledger: &L,
) -> EngineResult<Vec<u128>> {
    let mut power = Vec::with_capacity(rule.voting_token_classes.len());
    for &class_id in &rule.voting_token_classes {
        let balance = ledger.balance_of(address, class_id).await?;
        let weight = ledger.voting_weight(class_id).await? as u128;
        power.push(balance * weight);
    }
    Ok(power)
}

/// Per-class total eligible power under `rule`: total supply times class
/// voting weight. Computed once when a voting item opens and frozen there.
pub async fn total_power<L: TokenLedger + ?Sized>(
    rule: &VotingRule,
    ledger: &L,
) -> EngineResult<Vec<u128>> {
    let mut power = Vec::with_capacity(rule.voting_token_classes.len());
    for &class_id in &rule.voting_token_classes {
        let supply = ledger.total_supply(class_id).await?;
        let weight = ledger.voting_weight(class_id).await? as u128;
        power.push(supply * weight);
    }
    Ok(power)
}

/// Whether the item's cumulative yes-power satisfies the rule's threshold.
///
/// Absolute majority measures against the total eligible power frozen at open
/// time; relative majority measures against the power of voters who have
/// participated so far (yes and no alike).
pub fn threshold_met(rule: &VotingRule, item: &VotingItem) -> bool {
    let yes = item.total_power_yes();
    let denominator = if rule.is_absolute_majority {
        item.total_eligible_power()
    } else {
        item.total_power_voted()
    };
    yes * 100 >= denominator * rule.approval_threshold_percentage as u128
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use agora_ledger::InMemoryTokenLedger;
    use proptest::prelude::*;

    fn rule(classes: Vec<u64>, pct: u8, absolute: bool) -> VotingRule {
        VotingRule {
            voting_token_classes: classes,
            approval_threshold_percentage: pct,
            voting_duration_secs: 1000,
            execution_pending_duration_secs: 1000,
            enabled: true,
            notes: String::new(),
            is_absolute_majority: absolute,
        }
    }

    fn item_with(yes: Vec<u128>, voted: Vec<u128>, total: Vec<u128>) -> VotingItem {
        VotingItem {
            voting_rule_index: 0,
            status: agora_core::VotingStatus::OnGoing,
            power_yes: yes,
            power_voted: voted,
            total_power: total,
            voters: HashSet::new(),
            started_at: 0,
            voting_deadline: 1000,
            execution_deadline: None,
            executed: false,
            pending_operations: vec![],
        }
    }

    #[tokio::test]
    async fn voter_power_weights_balances() {
        let ledger = InMemoryTokenLedger::new();
        ledger.create_class(1, "common", 1, 1).await.unwrap();
        ledger.create_class(2, "preferred", 5, 5).await.unwrap();
        ledger.mint(&"alice".to_string(), 1, 3).await.unwrap();
        ledger.mint(&"alice".to_string(), 2, 1).await.unwrap();

        let rule = rule(vec![1, 2], 51, true);
        let power = voter_power(&rule, &"alice".to_string(), &ledger).await.unwrap();
        assert_eq!(power, vec![3, 5]);
    }

    #[tokio::test]
    async fn total_power_uses_supply() {
        let ledger = InMemoryTokenLedger::new();
        ledger.create_class(1, "common", 2, 1).await.unwrap();
        ledger.mint(&"alice".to_string(), 1, 10).await.unwrap();
        ledger.mint(&"bob".to_string(), 1, 5).await.unwrap();

        let rule = rule(vec![1], 51, true);
        let total = total_power(&rule, &ledger).await.unwrap();
        assert_eq!(total, vec![30]);
    }

    #[test]
    fn disabled_rule_is_unknown() {
        let mut r = rule(vec![1], 51, true);
        r.enabled = false;
        let rules = vec![r];
        assert!(matches!(
            get_rule(&rules, 0),
            Err(EngineError::UnknownVotingRule(0))
        ));
        assert!(matches!(
            get_rule(&rules, 5),
            Err(EngineError::UnknownVotingRule(5))
        ));
    }

    #[test]
    fn absolute_majority_measures_against_total() {
        let r = rule(vec![1, 2], 51, true);
        // 13 of 31: below 51%.
        let item = item_with(vec![8, 5], vec![8, 5], vec![16, 15]);
        assert!(!threshold_met(&r, &item));
        // 21 of 31: above 51%.
        let item = item_with(vec![11, 10], vec![11, 10], vec![16, 15]);
        assert!(threshold_met(&r, &item));
    }

    #[test]
    fn relative_majority_measures_against_participants() {
        let r = rule(vec![1], 60, false);
        // 6 yes of 10 voted is 60%: met, even though total is 100.
        let item = item_with(vec![6], vec![10], vec![100]);
        assert!(threshold_met(&r, &item));
        // 5 yes of 10 voted is 50%: not met.
        let item = item_with(vec![5], vec![10], vec![100]);
        assert!(!threshold_met(&r, &item));
    }

    proptest! {
        #[test]
        fn absolute_threshold_matches_integer_inequality(
            yes in 0u128..1_000_000,
            extra in 0u128..1_000_000,
            pct in 0u8..=100,
        ) {
            let total = yes + extra;
            let r = rule(vec![1], pct, true);
            let item = item_with(vec![yes], vec![yes], vec![total]);
            prop_assert_eq!(
                threshold_met(&r, &item),
                yes * 100 >= total * pct as u128
            );
        }

        #[test]
        fn more_yes_power_never_unmeets_threshold(
            yes in 0u128..1_000_000,
            bump in 0u128..1_000_000,
            total in 1u128..2_000_000,
            pct in 0u8..=100,
        ) {
            let r = rule(vec![1], pct, true);
            let before = item_with(vec![yes], vec![yes], vec![total]);
            let after = item_with(vec![yes + bump], vec![yes + bump], vec![total]);
            if threshold_met(&r, &before) {
                prop_assert!(threshold_met(&r, &after));
            }
        }
    }
}
