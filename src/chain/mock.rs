//! Mock chain for testing without a node.

use super::{LendingReads, PairReads, PoolInfo, PoolReads, ReadError, Slot0, StakingReads};
use crate::domain::Address;
use crate::engine::liquidity::{FeeGrowth, RangePosition};
use async_trait::async_trait;
use ethnum::U256;
use std::collections::{HashMap, HashSet};

/// In-memory chain state answering every read trait.
///
/// Balances default to zero like an ERC-20 `balanceOf`; venue-level reads
/// that were never configured revert.
#[derive(Debug, Clone, Default)]
pub struct MockChain {
    underlying: HashMap<Address, Address>,
    supplied: HashMap<(Address, Address), U256>,
    borrowed: HashMap<(Address, Address), U256>,
    shares: HashMap<(Address, Address), U256>,
    supply_index: HashMap<Address, U256>,
    borrow_index: HashMap<Address, U256>,
    market_borrow_index: HashMap<Address, U256>,
    pools: HashMap<Address, PoolInfo>,
    slot0: HashMap<Address, Slot0>,
    fee_global: HashMap<Address, FeeGrowth>,
    fee_outside: HashMap<(Address, i32), FeeGrowth>,
    range_positions: HashMap<(Address, String), RangePosition>,
    total_pooled: HashMap<Address, U256>,
    total_shares: HashMap<Address, U256>,
    pair_tokens: HashMap<Address, (Address, Address)>,
    reserves: HashMap<Address, (U256, U256)>,
    lp_supply: HashMap<Address, U256>,
    reverting_owners: HashSet<Address>,
}

impl MockChain {
    /// Create a new mock chain with no state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_underlying(mut self, market: Address, token: Address) -> Self {
        self.underlying.insert(market, token);
        self
    }

    pub fn with_supplied(mut self, market: Address, owner: Address, amount: U256) -> Self {
        self.supplied.insert((market, owner), amount);
        self
    }

    pub fn with_borrowed(mut self, market: Address, owner: Address, amount: U256) -> Self {
        self.borrowed.insert((market, owner), amount);
        self
    }

    /// Share balance; also serves `shares_of` for staking tokens and
    /// `lp_balance` for pairs.
    pub fn with_shares(mut self, venue: Address, owner: Address, amount: U256) -> Self {
        self.shares.insert((venue, owner), amount);
        self
    }

    pub fn with_supply_index(mut self, market: Address, index: U256) -> Self {
        self.supply_index.insert(market, index);
        self
    }

    pub fn with_borrow_index(mut self, market: Address, index: U256) -> Self {
        self.borrow_index.insert(market, index);
        self
    }

    pub fn with_market_borrow_index(mut self, market: Address, index: U256) -> Self {
        self.market_borrow_index.insert(market, index);
        self
    }

    pub fn with_pool(mut self, pool: Address, info: PoolInfo) -> Self {
        self.pools.insert(pool, info);
        self
    }

    pub fn with_slot0(mut self, pool: Address, sqrt_price_x96: U256, tick: i32) -> Self {
        self.slot0.insert(pool, Slot0 { sqrt_price_x96, tick });
        self
    }

    pub fn with_fee_growth_global(mut self, pool: Address, growth: FeeGrowth) -> Self {
        self.fee_global.insert(pool, growth);
        self
    }

    pub fn with_fee_growth_outside(mut self, pool: Address, tick: i32, growth: FeeGrowth) -> Self {
        self.fee_outside.insert((pool, tick), growth);
        self
    }

    pub fn with_range_position(
        mut self,
        pool: Address,
        token_id: impl Into<String>,
        position: RangePosition,
    ) -> Self {
        self.range_positions.insert((pool, token_id.into()), position);
        self
    }

    pub fn with_staking_totals(mut self, token: Address, pooled: U256, shares: U256) -> Self {
        self.total_pooled.insert(token, pooled);
        self.total_shares.insert(token, shares);
        self
    }

    pub fn with_pair(mut self, pair: Address, token0: Address, token1: Address) -> Self {
        self.pair_tokens.insert(pair, (token0, token1));
        self
    }

    pub fn with_reserves(mut self, pair: Address, reserve0: U256, reserve1: U256, total_supply: U256) -> Self {
        self.reserves.insert(pair, (reserve0, reserve1));
        self.lp_supply.insert(pair, total_supply);
        self
    }

    /// Every owner-scoped read for `owner` reverts.
    pub fn with_reverting_owner(mut self, owner: Address) -> Self {
        self.reverting_owners.insert(owner);
        self
    }

    fn owner_read(
        &self,
        table: &HashMap<(Address, Address), U256>,
        venue: &Address,
        owner: &Address,
        call: &str,
    ) -> Result<U256, ReadError> {
        if self.reverting_owners.contains(owner) {
            return Err(ReadError::Reverted(format!("{}({})", call, owner)));
        }
        Ok(table.get(&(*venue, *owner)).copied().unwrap_or(U256::ZERO))
    }
}

fn venue_read<T: Copy>(table: &HashMap<Address, T>, venue: &Address, call: &str) -> Result<T, ReadError> {
    table
        .get(venue)
        .copied()
        .ok_or_else(|| ReadError::Reverted(format!("{} on {}", call, venue)))
}

#[async_trait]
impl LendingReads for MockChain {
    async fn underlying_token(&self, market: &Address) -> Result<Address, ReadError> {
        venue_read(&self.underlying, market, "underlying")
    }

    async fn underlying_balance(&self, market: &Address, owner: &Address) -> Result<U256, ReadError> {
        self.owner_read(&self.supplied, market, owner, "balanceOfUnderlying")
    }

    async fn borrow_balance(&self, market: &Address, owner: &Address) -> Result<U256, ReadError> {
        self.owner_read(&self.borrowed, market, owner, "borrowBalanceStored")
    }

    async fn share_balance(&self, market: &Address, owner: &Address) -> Result<U256, ReadError> {
        self.owner_read(&self.shares, market, owner, "balanceOf")
    }

    async fn supply_reward_index(&self, market: &Address) -> Result<U256, ReadError> {
        venue_read(&self.supply_index, market, "supplyState")
    }

    async fn borrow_reward_index(&self, market: &Address) -> Result<U256, ReadError> {
        venue_read(&self.borrow_index, market, "borrowState")
    }

    async fn market_borrow_index(&self, market: &Address) -> Result<U256, ReadError> {
        venue_read(&self.market_borrow_index, market, "borrowIndex")
    }
}

#[async_trait]
impl PoolReads for MockChain {
    async fn pool_info(&self, pool: &Address) -> Result<PoolInfo, ReadError> {
        venue_read(&self.pools, pool, "pool")
    }

    async fn slot0(&self, pool: &Address) -> Result<Slot0, ReadError> {
        venue_read(&self.slot0, pool, "slot0")
    }

    async fn fee_growth_global(&self, pool: &Address) -> Result<FeeGrowth, ReadError> {
        venue_read(&self.fee_global, pool, "feeGrowthGlobal")
    }

    async fn fee_growth_outside(&self, pool: &Address, tick: i32) -> Result<FeeGrowth, ReadError> {
        // uninitialized ticks report zero growth
        Ok(self
            .fee_outside
            .get(&(*pool, tick))
            .copied()
            .unwrap_or_default())
    }

    async fn range_position(&self, pool: &Address, token_id: &str) -> Result<RangePosition, ReadError> {
        self.range_positions
            .get(&(*pool, token_id.to_string()))
            .copied()
            .ok_or_else(|| ReadError::Reverted(format!("positions({})", token_id)))
    }
}

#[async_trait]
impl StakingReads for MockChain {
    async fn shares_of(&self, token: &Address, owner: &Address) -> Result<U256, ReadError> {
        self.owner_read(&self.shares, token, owner, "sharesOf")
    }

    async fn total_pooled(&self, token: &Address) -> Result<U256, ReadError> {
        venue_read(&self.total_pooled, token, "getTotalPooledEther")
    }

    async fn total_shares(&self, token: &Address) -> Result<U256, ReadError> {
        venue_read(&self.total_shares, token, "getTotalShares")
    }
}

#[async_trait]
impl PairReads for MockChain {
    async fn pair_tokens(&self, pair: &Address) -> Result<(Address, Address), ReadError> {
        venue_read(&self.pair_tokens, pair, "token0")
    }

    async fn reserves(&self, pair: &Address) -> Result<(U256, U256), ReadError> {
        venue_read(&self.reserves, pair, "getReserves")
    }

    async fn total_supply(&self, pair: &Address) -> Result<U256, ReadError> {
        venue_read(&self.lp_supply, pair, "totalSupply")
    }

    async fn lp_balance(&self, pair: &Address, owner: &Address) -> Result<U256, ReadError> {
        self.owner_read(&self.shares, pair, owner, "balanceOf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    #[tokio::test]
    async fn test_mock_balances_default_to_zero() {
        let chain = MockChain::new().with_supplied(addr(1), addr(2), U256::from(50u32));
        assert_eq!(
            chain.underlying_balance(&addr(1), &addr(2)).await.unwrap(),
            U256::from(50u32)
        );
        assert_eq!(
            chain.underlying_balance(&addr(1), &addr(3)).await.unwrap(),
            U256::ZERO
        );
    }

    #[tokio::test]
    async fn test_mock_reverting_owner() {
        let chain = MockChain::new()
            .with_supplied(addr(1), addr(2), U256::from(50u32))
            .with_reverting_owner(addr(2));
        let err = chain.underlying_balance(&addr(1), &addr(2)).await.unwrap_err();
        assert!(matches!(err, ReadError::Reverted(_)));
    }

    #[tokio::test]
    async fn test_mock_unconfigured_venue_reverts() {
        let chain = MockChain::new();
        assert!(chain.slot0(&addr(9)).await.is_err());
        assert!(chain.underlying_token(&addr(9)).await.is_err());
        assert_eq!(
            chain.fee_growth_outside(&addr(9), 60).await.unwrap(),
            FeeGrowth::default()
        );
    }
}
