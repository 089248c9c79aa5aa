//! Outbound chain-read capabilities.
//!
//! Each protocol family gets one capability object keyed by venue address.
//! Reads are fallible: a reverted call is an ordinary outcome the
//! caller matches on, not a panic.

use crate::domain::{Address, Investment, Position, PositionParams};
use crate::engine::liquidity::{FeeGrowth, RangePosition};
use async_trait::async_trait;
use ethnum::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod mock;
pub mod recorded;

pub use mock::MockChain;
pub use recorded::{RecordedRead, RecordedValuer};

/// Pool token pair and fee tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
}

/// Current price state of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot0 {
    #[serde(with = "crate::domain::amount::u256_string")]
    pub sqrt_price_x96: U256,
    pub tick: i32,
}

/// Lending market reads (Compound-style cToken plus comptroller indices).
#[async_trait]
pub trait LendingReads: Send + Sync + fmt::Debug {
    async fn underlying_token(&self, market: &Address) -> Result<Address, ReadError>;

    /// Supplied balance in underlying units.
    async fn underlying_balance(&self, market: &Address, owner: &Address) -> Result<U256, ReadError>;

    async fn borrow_balance(&self, market: &Address, owner: &Address) -> Result<U256, ReadError>;

    /// Market share (cToken) balance.
    async fn share_balance(&self, market: &Address, owner: &Address) -> Result<U256, ReadError>;

    async fn supply_reward_index(&self, market: &Address) -> Result<U256, ReadError>;

    async fn borrow_reward_index(&self, market: &Address) -> Result<U256, ReadError>;

    /// Market interest index (`borrowIndex`), scaled by 1e18.
    async fn market_borrow_index(&self, market: &Address) -> Result<U256, ReadError>;
}

/// Concentrated-liquidity pool and position-manager reads.
#[async_trait]
pub trait PoolReads: Send + Sync + fmt::Debug {
    async fn pool_info(&self, pool: &Address) -> Result<PoolInfo, ReadError>;

    async fn slot0(&self, pool: &Address) -> Result<Slot0, ReadError>;

    async fn fee_growth_global(&self, pool: &Address) -> Result<FeeGrowth, ReadError>;

    async fn fee_growth_outside(&self, pool: &Address, tick: i32) -> Result<FeeGrowth, ReadError>;

    /// Position-manager state of the NFT `token_id` minted against `pool`.
    async fn range_position(&self, pool: &Address, token_id: &str) -> Result<RangePosition, ReadError>;
}

/// Liquid-staking token reads.
#[async_trait]
pub trait StakingReads: Send + Sync + fmt::Debug {
    async fn shares_of(&self, token: &Address, owner: &Address) -> Result<U256, ReadError>;

    async fn total_pooled(&self, token: &Address) -> Result<U256, ReadError>;

    async fn total_shares(&self, token: &Address) -> Result<U256, ReadError>;
}

/// Constant-product pair reads (Uniswap-v2-style LP token).
#[async_trait]
pub trait PairReads: Send + Sync + fmt::Debug {
    async fn pair_tokens(&self, pair: &Address) -> Result<(Address, Address), ReadError>;

    async fn reserves(&self, pair: &Address) -> Result<(U256, U256), ReadError>;

    async fn total_supply(&self, pair: &Address) -> Result<U256, ReadError>;

    async fn lp_balance(&self, pair: &Address, owner: &Address) -> Result<U256, ReadError>;
}

/// Re-derives the true current value of an open position.
#[async_trait]
pub trait PositionValuer: Send + Sync {
    async fn current_value(
        &self,
        investment: &Investment,
        position: &Position,
    ) -> Result<PositionParams, ReadError>;
}

/// Error type for chain reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum ReadError {
    /// The call executed and reverted
    Reverted(String),
    /// The node could not serve the call
    Unavailable(String),
    /// Return data could not be decoded
    Decode(String),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Reverted(msg) => write!(f, "Call reverted: {}", msg),
            ReadError::Unavailable(msg) => write!(f, "Read unavailable: {}", msg),
            ReadError::Decode(msg) => write!(f, "Decode error: {}", msg),
        }
    }
}

impl std::error::Error for ReadError {}

impl From<crate::error::MathError> for ReadError {
    fn from(err: crate::error::MathError) -> Self {
        ReadError::Decode(err.to_string())
    }
}
