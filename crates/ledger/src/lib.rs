//! Multi-class token ledger for Agora
//!
//! The engine never stores balances itself; it talks to a [`TokenLedger`],
//! a collaborator assumed to be consistent and atomic per call. Token classes
//! are fungible buckets with a voting weight and a dividend weight attached.
//! An in-memory implementation backs the engine and its tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use agora_core::{Address, ClassId};

pub mod memory;

pub use memory::InMemoryTokenLedger;

/// Error types for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Referenced token class does not exist
    #[error("Unknown token class: {0}")]
    UnknownTokenClass(ClassId),

    /// Attempt to create a class with an id already in use
    #[error("Token class already exists: {0}")]
    ClassAlreadyExists(ClassId),

    /// Balance too low for a transfer or burn
    #[error("Insufficient balance: address {address} holds {held} of class {class_id}, needs {needed}")]
    InsufficientBalance {
        /// Address whose balance was checked.
        address: Address,
        /// Class being debited.
        class_id: ClassId,
        /// Balance actually held.
        held: u128,
        /// Amount required.
        needed: u128,
    },
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// A token class: a fungible bucket with voting and dividend weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClass {
    /// Class identifier.
    pub id: ClassId,
    /// Human-readable name.
    pub name: String,
    /// Voting power per token.
    pub voting_weight: u64,
    /// Dividend share per token.
    pub dividend_weight: u64,
    /// Total tokens minted minus burned.
    pub total_supply: u128,
}

/// The token ledger collaborator consumed by the engine.
///
/// Implementations must apply each call atomically; the engine relies on that
/// to keep per-operation mutations all-or-nothing.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    /// Create a token class.
    async fn create_class(
        &self,
        id: ClassId,
        name: &str,
        voting_weight: u64,
        dividend_weight: u64,
    ) -> LedgerResult<()>;

    /// Whether a class exists.
    async fn class_exists(&self, id: ClassId) -> bool;

    /// Balance of `address` in `class_id`.
    async fn balance_of(&self, address: &Address, class_id: ClassId) -> LedgerResult<u128>;

    /// Total supply of `class_id`.
    async fn total_supply(&self, class_id: ClassId) -> LedgerResult<u128>;

    /// Voting weight of `class_id`.
    async fn voting_weight(&self, class_id: ClassId) -> LedgerResult<u64>;

    /// Dividend weight of `class_id`.
    async fn dividend_weight(&self, class_id: ClassId) -> LedgerResult<u64>;

    /// Mint `amount` of `class_id` to `address`.
    async fn mint(&self, address: &Address, class_id: ClassId, amount: u128) -> LedgerResult<()>;

    /// Move `amount` of `class_id` from `from` to `to`.
    async fn transfer(
        &self,
        from: &Address,
        to: &Address,
        class_id: ClassId,
        amount: u128,
    ) -> LedgerResult<()>;

    /// Burn `amount` of `class_id` held by `address`.
    async fn burn(&self, address: &Address, class_id: ClassId, amount: u128) -> LedgerResult<()>;
}
