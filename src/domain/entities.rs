//! Ledger entities. Relationships are ids, resolved through the store.

use crate::domain::{Address, Amount, EntityId, PositionChangeAction, PositionKind, TxHash};
use serde::{Deserialize, Serialize};

/// Upper bound on opaque protocol metadata slots.
pub const MAX_META_SLOTS: usize = 8;

/// One row per (protocol name, chain).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub id: EntityId,
    pub name: String,
    pub chain: String,
    pub meta: Vec<String>,
    /// Round-robin reconciliation cursor.
    pub batch_cursor: u32,
    pub block_number: u64,
}

/// A distinct on-chain venue (market, pool, staking contract).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investment {
    pub id: EntityId,
    pub protocol_id: EntityId,
    pub address: Address,
    pub tag: String,
    /// Fixed at creation; amount vectors are indexed positionally against it.
    pub input_tokens: Vec<Address>,
    pub reward_tokens: Vec<Address>,
    pub meta: Vec<String>,
    pub block_number: u64,
    pub block_timestamp: u64,
}

/// A user's stake in one investment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: EntityId,
    pub investment_id: EntityId,
    pub owner: Address,
    pub tag: String,
    pub kind: PositionKind,
    /// Input amounts followed by reward amounts.
    pub amounts: Vec<Amount>,
    pub initial_amounts: Vec<Amount>,
    /// Number of leading entries of `amounts` that are input amounts.
    pub input_count: usize,
    pub liquidity: Amount,
    pub closed: bool,
    pub meta: Vec<String>,
    pub block_number: u64,
}

impl Position {
    pub fn input_amounts(&self) -> &[Amount] {
        &self.amounts[..self.input_count.min(self.amounts.len())]
    }

    pub fn reward_amounts(&self) -> &[Amount] {
        &self.amounts[self.input_count.min(self.amounts.len())..]
    }
}

/// Append-only audit record of one mutating event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionChange {
    pub id: EntityId,
    pub position_id: EntityId,
    pub action: PositionChangeAction,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub tx_hash: TxHash,
    pub log_index: u32,
    pub d_amounts: Vec<Amount>,
    pub after_amounts: Vec<Amount>,
}

/// Point-in-time amounts of a position at one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub id: EntityId,
    pub position_id: EntityId,
    pub amounts: Vec<Amount>,
    pub block_number: u64,
    pub block_timestamp: u64,
}

/// Membership of an owner in an investment's participant set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Holder {
    pub investment_id: EntityId,
    pub owner: Address,
}

/// A position is closed once every amount, input and reward, is zero.
pub fn is_closed(amounts: &[Amount]) -> bool {
    amounts.iter().all(Amount::is_zero)
}
