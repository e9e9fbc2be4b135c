//! In-memory token ledger
//!
//! Backing store for the engine and its tests: class records and balances in
//! `DashMap`s. Calls are atomic per entry; the engine serializes programs, so
//! no cross-call coordination is needed.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use agora_core::{Address, ClassId};

use crate::{LedgerError, LedgerResult, TokenClass, TokenLedger};

/// A `TokenLedger` held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryTokenLedger {
    /// Token classes by id.
    classes: DashMap<ClassId, TokenClass>,
    /// Balances keyed by (class, holder).
    balances: DashMap<(ClassId, Address), u128>,
}

impl InMemoryTokenLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn class(&self, id: ClassId) -> LedgerResult<TokenClass> {
        self.classes
            .get(&id)
            .map(|c| c.clone())
            .ok_or(LedgerError::UnknownTokenClass(id))
    }
}

#[async_trait]
impl TokenLedger for InMemoryTokenLedger {
    async fn create_class(
        &self,
        id: ClassId,
        name: &str,
        voting_weight: u64,
        dividend_weight: u64,
    ) -> LedgerResult<()> {
        if self.classes.contains_key(&id) {
            return Err(LedgerError::ClassAlreadyExists(id));
        }
        self.classes.insert(
            id,
            TokenClass {
                id,
                name: name.to_string(),
                voting_weight,
                dividend_weight,
                total_supply: 0,
            },
        );
        debug!(class_id = id, name, "created token class");
        Ok(())
    }

    async fn class_exists(&self, id: ClassId) -> bool {
        self.classes.contains_key(&id)
    }

    async fn balance_of(&self, address: &Address, class_id: ClassId) -> LedgerResult<u128> {
        self.class(class_id)?;
        Ok(self
            .balances
            .get(&(class_id, address.clone()))
            .map(|b| *b)
            .unwrap_or(0))
    }

    async fn total_supply(&self, class_id: ClassId) -> LedgerResult<u128> {
        Ok(self.class(class_id)?.total_supply)
    }

    async fn voting_weight(&self, class_id: ClassId) -> LedgerResult<u64> {
        Ok(self.class(class_id)?.voting_weight)
    }

    async fn dividend_weight(&self, class_id: ClassId) -> LedgerResult<u64> {
        Ok(self.class(class_id)?.dividend_weight)
    }

    async fn mint(&self, address: &Address, class_id: ClassId, amount: u128) -> LedgerResult<()> {
        {
            let mut class = self
                .classes
                .get_mut(&class_id)
                .ok_or(LedgerError::UnknownTokenClass(class_id))?;
            class.total_supply += amount;
        }
        *self
            .balances
            .entry((class_id, address.clone()))
            .or_insert(0) += amount;
        debug!(class_id, %address, amount, "minted tokens");
        Ok(())
    }

    async fn transfer(
        &self,
        from: &Address,
        to: &Address,
        class_id: ClassId,
        amount: u128,
    ) -> LedgerResult<()> {
        self.class(class_id)?;
        {
            let mut from_balance = self
                .balances
                .entry((class_id, from.clone()))
                .or_insert(0);
            if *from_balance < amount {
                return Err(LedgerError::InsufficientBalance {
                    address: from.clone(),
                    class_id,
                    held: *from_balance,
                    needed: amount,
                });
            }
            *from_balance -= amount;
        }
        *self.balances.entry((class_id, to.clone())).or_insert(0) += amount;
        debug!(class_id, %from, %to, amount, "transferred tokens");
        Ok(())
    }

    async fn burn(&self, address: &Address, class_id: ClassId, amount: u128) -> LedgerResult<()> {
        {
            let mut balance = self
                .balances
                .entry((class_id, address.clone()))
                .or_insert(0);
            if *balance < amount {
                return Err(LedgerError::InsufficientBalance {
                    address: address.clone(),
                    class_id,
                    held: *balance,
                    needed: amount,
                });
            }
            *balance -= amount;
        }
        let mut class = self
            .classes
            .get_mut(&class_id)
            .ok_or(LedgerError::UnknownTokenClass(class_id))?;
        class.total_supply -= amount;
        debug!(class_id, %address, amount, "burned tokens");
        Ok(())
    }
}
