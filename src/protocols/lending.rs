//! Compound-style lending markets.
//!
//! Each market is one investment with the underlying token as its single
//! input. An owner holds up to two positions per market, tagged `supply`
//! and `borrow`. When the market distributes a reward token, the accrued
//! reward is the position's single reward amount and the reward index last
//! seen is kept in meta slot 0.

use crate::chain::{LendingReads, PositionValuer, ReadError};
use crate::domain::{Address, Amount, Investment, InvestmentTokens, Position, PositionKind, PositionParams};
use crate::engine::liquidity::mul_div;
use crate::engine::{accrue, RewardAccrual};
use crate::orchestration::InvestmentHelper;
use async_trait::async_trait;
use ethnum::U256;
use std::sync::Arc;

pub const SUPPLY_TAG: &str = "supply";
pub const BORROW_TAG: &str = "borrow";

/// Fixed-point scale of comptroller reward indices (1e36).
pub const REWARD_INDEX_SCALE: U256 = U256::from_words(0, 0x00c0_97ce_7bc9_0715_b34b_9f10_0000_0000);

/// Fixed-point scale of the market interest index (1e18).
pub const BORROW_INDEX_SCALE: U256 = U256::from_words(0, 1_000_000_000_000_000_000);

pub fn tag_for(kind: PositionKind) -> &'static str {
    match kind {
        PositionKind::Borrow => BORROW_TAG,
        _ => SUPPLY_TAG,
    }
}

#[derive(Debug, Clone)]
pub struct LendingMarket {
    protocol_name: String,
    market: Address,
    reward_token: Option<Address>,
    reads: Arc<dyn LendingReads>,
}

impl LendingMarket {
    pub fn new(protocol_name: impl Into<String>, market: Address, reads: Arc<dyn LendingReads>) -> Self {
        Self {
            protocol_name: protocol_name.into(),
            market,
            reward_token: None,
            reads,
        }
    }

    pub fn with_reward_token(mut self, token: Address) -> Self {
        self.reward_token = Some(token);
        self
    }
}

#[async_trait]
impl InvestmentHelper for LendingMarket {
    fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    fn investment_address(&self) -> Address {
        self.market
    }

    /// Native-asset markets have no `underlying()`; the zero address stands
    /// in for the chain's native token.
    async fn get_tokens(&self) -> Result<InvestmentTokens, ReadError> {
        let underlying = match self.reads.underlying_token(&self.market).await {
            Ok(token) => token,
            Err(ReadError::Reverted(_)) => Address::ZERO,
            Err(e) => return Err(e),
        };
        Ok(InvestmentTokens::new(
            vec![underlying],
            self.reward_token.into_iter().collect(),
            Vec::new(),
        ))
    }
}

/// Values supply and borrow positions from live market reads.
#[derive(Debug, Clone)]
pub struct LendingValuer {
    reads: Arc<dyn LendingReads>,
    index_scale: U256,
}

impl LendingValuer {
    pub fn new(reads: Arc<dyn LendingReads>) -> Self {
        Self {
            reads,
            index_scale: REWARD_INDEX_SCALE,
        }
    }

    pub fn with_index_scale(mut self, index_scale: U256) -> Self {
        self.index_scale = index_scale;
        self
    }

    /// Current params of `owner`'s `kind` position, accruing rewards from
    /// the checkpoint held by `previous`.
    pub async fn value_owner(
        &self,
        investment: &Investment,
        owner: &Address,
        kind: PositionKind,
        previous: Option<&Position>,
    ) -> Result<PositionParams, ReadError> {
        let market = &investment.address;
        let amount = match kind {
            PositionKind::Borrow => self.reads.borrow_balance(market, owner).await?,
            _ => self.reads.underlying_balance(market, owner).await?,
        };

        let mut params = PositionParams::new(*owner, kind, vec![Amount::from_unsigned(amount)?])
            .with_tag(tag_for(kind));
        if investment.reward_tokens.is_empty() {
            return Ok(params);
        }

        // borrow rewards accrue on principal: debt over the market interest index
        let (accrual_balance, global_index) = match kind {
            PositionKind::Borrow => {
                let interest_index = self.reads.market_borrow_index(market).await?;
                (
                    mul_div(amount, BORROW_INDEX_SCALE, interest_index)?,
                    self.reads.borrow_reward_index(market).await?,
                )
            }
            _ => (
                self.reads.share_balance(market, owner).await?,
                self.reads.supply_reward_index(market).await?,
            ),
        };
        let checkpoint = previous
            .map(|p| checkpoint_of(p, global_index))
            .transpose()?
            .unwrap_or(RewardAccrual::new(global_index, U256::ZERO));
        let next = accrue(checkpoint, accrual_balance, global_index, self.index_scale)?;

        let mut rewards = vec![Amount::zero(); investment.reward_tokens.len()];
        rewards[0] = Amount::from_unsigned(next.accrued)?;
        params = params
            .with_rewards(rewards)
            .with_meta(vec![next.stored_index.to_string()]);
        Ok(params)
    }
}

/// Stored reward checkpoint of a position; a position without one starts at
/// `fallback_index` and accrues nothing retroactively.
fn checkpoint_of(position: &Position, fallback_index: U256) -> Result<RewardAccrual, ReadError> {
    let stored_index = match position.meta.first() {
        Some(raw) => U256::from_str_radix(raw, 10)
            .map_err(|e| ReadError::Decode(format!("reward index {:?}: {}", raw, e)))?,
        None => fallback_index,
    };
    let accrued = position
        .reward_amounts()
        .first()
        .and_then(Amount::to_unsigned)
        .unwrap_or(U256::ZERO);
    Ok(RewardAccrual::new(stored_index, accrued))
}

#[async_trait]
impl PositionValuer for LendingValuer {
    async fn current_value(
        &self,
        investment: &Investment,
        position: &Position,
    ) -> Result<PositionParams, ReadError> {
        self.value_owner(investment, &position.owner, position.kind, Some(position))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChain;
    use crate::domain::EntityId;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    fn market_investment(rewards: bool) -> Investment {
        Investment {
            id: EntityId::from_hex("market"),
            protocol_id: EntityId::from_hex("proto"),
            address: addr(0xcc),
            tag: String::new(),
            input_tokens: vec![addr(0x01)],
            reward_tokens: if rewards { vec![addr(0x02)] } else { vec![] },
            meta: vec![],
            block_number: 1,
            block_timestamp: 1,
        }
    }

    #[test]
    fn test_reward_index_scale_is_1e36() {
        assert_eq!(
            REWARD_INDEX_SCALE,
            U256::from_str_radix("1000000000000000000000000000000000000", 10).unwrap()
        );
    }

    #[tokio::test]
    async fn test_native_market_falls_back_to_zero_address() {
        let chain = Arc::new(MockChain::new());
        let market = LendingMarket::new("CompoundV2", addr(0xcc), chain).with_reward_token(addr(0x02));
        let tokens = market.get_tokens().await.unwrap();
        assert_eq!(tokens.input_tokens, vec![Address::ZERO]);
        assert_eq!(tokens.reward_tokens, vec![addr(0x02)]);
    }

    #[tokio::test]
    async fn test_supply_and_borrow_values() {
        let chain = Arc::new(
            MockChain::new()
                .with_supplied(addr(0xcc), addr(0x11), U256::from(100u32))
                .with_borrowed(addr(0xcc), addr(0x11), U256::from(30u32)),
        );
        let valuer = LendingValuer::new(chain);
        let investment = market_investment(false);

        let supply = valuer
            .value_owner(&investment, &addr(0x11), PositionKind::Supply, None)
            .await
            .unwrap();
        assert_eq!(supply.input_amounts, vec![Amount::from(100i64)]);
        assert_eq!(supply.tag, SUPPLY_TAG);

        let borrow = valuer
            .value_owner(&investment, &addr(0x11), PositionKind::Borrow, None)
            .await
            .unwrap();
        assert_eq!(borrow.input_amounts, vec![Amount::from(30i64)]);
        assert_eq!(borrow.tag, BORROW_TAG);
    }

    #[tokio::test]
    async fn test_reward_accrues_from_stored_index() {
        let scale = U256::from(1000u32);
        let investment = market_investment(true);
        let first_chain = Arc::new(
            MockChain::new()
                .with_supplied(addr(0xcc), addr(0x11), U256::from(100u32))
                .with_shares(addr(0xcc), addr(0x11), U256::from(500u32))
                .with_supply_index(addr(0xcc), U256::from(2000u32)),
        );
        let first = LendingValuer::new(first_chain)
            .with_index_scale(scale)
            .value_owner(&investment, &addr(0x11), PositionKind::Supply, None)
            .await
            .unwrap();
        // first sighting: checkpoint only
        assert_eq!(first.reward_amounts, vec![Amount::zero()]);
        assert_eq!(first.meta, vec!["2000".to_string()]);

        let previous = Position {
            id: EntityId::from_hex("pos"),
            investment_id: investment.id.clone(),
            owner: addr(0x11),
            tag: SUPPLY_TAG.to_string(),
            kind: PositionKind::Supply,
            amounts: first.amounts(),
            initial_amounts: first.amounts(),
            input_count: 1,
            liquidity: Amount::zero(),
            closed: false,
            meta: first.meta.clone(),
            block_number: 1,
        };
        let second_chain = Arc::new(
            MockChain::new()
                .with_supplied(addr(0xcc), addr(0x11), U256::from(101u32))
                .with_shares(addr(0xcc), addr(0x11), U256::from(500u32))
                .with_supply_index(addr(0xcc), U256::from(2010u32)),
        );
        let second = LendingValuer::new(second_chain)
            .with_index_scale(scale)
            .current_value(&investment, &previous)
            .await
            .unwrap();
        // 500 shares * 10 / 1000
        assert_eq!(second.reward_amounts, vec![Amount::from(5i64)]);
        assert_eq!(second.meta, vec!["2010".to_string()]);
    }

    #[tokio::test]
    async fn test_borrow_reward_accrues_on_principal() {
        let scale = U256::from(1000u32);
        let investment = market_investment(true);
        let previous = Position {
            id: EntityId::from_hex("pos"),
            investment_id: investment.id.clone(),
            owner: addr(0x11),
            tag: BORROW_TAG.to_string(),
            kind: PositionKind::Borrow,
            amounts: vec![Amount::from(1000i64), Amount::zero()],
            initial_amounts: vec![Amount::from(1000i64), Amount::zero()],
            input_count: 1,
            liquidity: Amount::zero(),
            closed: false,
            meta: vec!["4000".to_string()],
            block_number: 1,
        };
        // 10% interest accrued since the loan opened: debt 1100, principal 1000
        let chain = Arc::new(
            MockChain::new()
                .with_borrowed(addr(0xcc), addr(0x11), U256::from(1100u32))
                .with_market_borrow_index(addr(0xcc), U256::from(1_100_000_000_000_000_000u64))
                .with_borrow_index(addr(0xcc), U256::from(4002u32)),
        );
        let value = LendingValuer::new(chain)
            .with_index_scale(scale)
            .current_value(&investment, &previous)
            .await
            .unwrap();
        assert_eq!(value.input_amounts, vec![Amount::from(1100i64)]);
        // 1000 principal * 2 / 1000, not 1100 * 2 / 1000
        assert_eq!(value.reward_amounts, vec![Amount::from(2i64)]);
        assert_eq!(value.meta, vec!["4002".to_string()]);
    }

    #[tokio::test]
    async fn test_borrow_reward_needs_interest_index() {
        let chain = Arc::new(
            MockChain::new()
                .with_borrowed(addr(0xcc), addr(0x11), U256::from(1100u32))
                .with_borrow_index(addr(0xcc), U256::from(4000u32)),
        );
        let err = LendingValuer::new(chain)
            .value_owner(&market_investment(true), &addr(0x11), PositionKind::Borrow, None)
            .await
            .unwrap_err();
        assert_eq!(err, ReadError::Reverted(format!("borrowIndex on {}", addr(0xcc))));
    }

    #[tokio::test]
    async fn test_reverted_balance_is_error() {
        let chain = Arc::new(MockChain::new().with_reverting_owner(addr(0x11)));
        let valuer = LendingValuer::new(chain);
        let err = valuer
            .value_owner(&market_investment(false), &addr(0x11), PositionKind::Supply, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReadError::Reverted(_)));
    }
}
