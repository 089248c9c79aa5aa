//! Concentrated-liquidity pools with NFT range positions.
//!
//! One investment per pool. The pool's two tokens are both the input tokens
//! (principal) and the reward tokens (uncollected fees). Each NFT is its own
//! position, tagged by token id, with its tick bounds in meta.

use crate::chain::{PoolReads, PositionValuer, ReadError};
use crate::domain::{Address, Amount, Investment, InvestmentTokens, Position, PositionKind, PositionParams};
use crate::engine::liquidity::{fee_growth_inside, principal_of, uncollected_fees};
use crate::orchestration::InvestmentHelper;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ConcentratedPool {
    protocol_name: String,
    pool: Address,
    reads: Arc<dyn PoolReads>,
}

impl ConcentratedPool {
    pub fn new(protocol_name: impl Into<String>, pool: Address, reads: Arc<dyn PoolReads>) -> Self {
        Self {
            protocol_name: protocol_name.into(),
            pool,
            reads,
        }
    }
}

#[async_trait]
impl InvestmentHelper for ConcentratedPool {
    fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    fn investment_address(&self) -> Address {
        self.pool
    }

    async fn get_tokens(&self) -> Result<InvestmentTokens, ReadError> {
        let info = self.reads.pool_info(&self.pool).await?;
        let tokens = vec![info.token0, info.token1];
        Ok(InvestmentTokens::new(tokens.clone(), tokens, vec![info.fee.to_string()]))
    }
}

#[derive(Debug, Clone)]
pub struct ConcentratedValuer {
    reads: Arc<dyn PoolReads>,
}

impl ConcentratedValuer {
    pub fn new(reads: Arc<dyn PoolReads>) -> Self {
        Self { reads }
    }

    /// Principal plus uncollected fees of NFT `token_id` held by `owner`.
    pub async fn value_nft(
        &self,
        investment: &Investment,
        owner: &Address,
        token_id: &str,
    ) -> Result<PositionParams, ReadError> {
        let pool = &investment.address;
        let range = self.reads.range_position(pool, token_id).await?;
        let slot0 = self.reads.slot0(pool).await?;

        let (amount0, amount1) = principal_of(
            range.tick_lower,
            range.tick_upper,
            range.liquidity,
            slot0.sqrt_price_x96,
        )?;

        let global = self.reads.fee_growth_global(pool).await?;
        let lower_outside = self.reads.fee_growth_outside(pool, range.tick_lower).await?;
        let upper_outside = self.reads.fee_growth_outside(pool, range.tick_upper).await?;
        let inside = fee_growth_inside(
            range.tick_lower,
            range.tick_upper,
            slot0.tick,
            global,
            lower_outside,
            upper_outside,
        );
        let (fee0, fee1) = uncollected_fees(&range, inside)?;

        debug!(
            pool = %pool,
            token_id = token_id,
            tick = slot0.tick,
            liquidity = range.liquidity,
            "valued range position"
        );

        Ok(PositionParams::new(
            *owner,
            PositionKind::Invest,
            vec![Amount::from_unsigned(amount0)?, Amount::from_unsigned(amount1)?],
        )
        .with_tag(token_id)
        .with_rewards(vec![Amount::from_unsigned(fee0)?, Amount::from_unsigned(fee1)?])
        .with_liquidity(Amount::from(range.liquidity))
        .with_meta(vec![range.tick_lower.to_string(), range.tick_upper.to_string()]))
    }
}

#[async_trait]
impl PositionValuer for ConcentratedValuer {
    async fn current_value(
        &self,
        investment: &Investment,
        position: &Position,
    ) -> Result<PositionParams, ReadError> {
        self.value_nft(investment, &position.owner, &position.tag).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{MockChain, PoolInfo};
    use crate::domain::EntityId;
    use crate::engine::liquidity::{get_sqrt_ratio_at_tick, FeeGrowth, RangePosition, Q128};
    use ethnum::U256;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    fn pool_investment() -> Investment {
        Investment {
            id: EntityId::from_hex("pool"),
            protocol_id: EntityId::from_hex("proto"),
            address: addr(0xdd),
            tag: String::new(),
            input_tokens: vec![addr(1), addr(2)],
            reward_tokens: vec![addr(1), addr(2)],
            meta: vec!["3000".to_string()],
            block_number: 1,
            block_timestamp: 1,
        }
    }

    #[tokio::test]
    async fn test_pool_tokens_double_as_rewards() {
        let chain = Arc::new(MockChain::new().with_pool(
            addr(0xdd),
            PoolInfo {
                token0: addr(1),
                token1: addr(2),
                fee: 3000,
            },
        ));
        let tokens = ConcentratedPool::new("UniswapV3", addr(0xdd), chain)
            .get_tokens()
            .await
            .unwrap();
        assert_eq!(tokens.input_tokens, vec![addr(1), addr(2)]);
        assert_eq!(tokens.reward_tokens, tokens.input_tokens);
        assert_eq!(tokens.meta, vec!["3000".to_string()]);
    }

    #[tokio::test]
    async fn test_value_nft_in_range() {
        let sqrt_price = get_sqrt_ratio_at_tick(0).unwrap();
        let range = RangePosition {
            tick_lower: -60,
            tick_upper: 60,
            liquidity: 1000,
            fee_growth_inside_last: FeeGrowth::default(),
            tokens_owed0: 7,
            tokens_owed1: 0,
        };
        let chain = Arc::new(
            MockChain::new()
                .with_slot0(addr(0xdd), sqrt_price, 0)
                .with_fee_growth_global(
                    addr(0xdd),
                    FeeGrowth::new(Q128 * U256::from(3u32), Q128 * U256::from(5u32)),
                )
                .with_range_position(addr(0xdd), "42", range),
        );
        let params = ConcentratedValuer::new(chain)
            .value_nft(&pool_investment(), &addr(0x11), "42")
            .await
            .unwrap();

        assert_eq!(params.tag, "42");
        assert_eq!(params.input_amounts.len(), 2);
        assert!(params.input_amounts.iter().all(Amount::is_positive));
        // 1000 * 3 plus 7 owed, 1000 * 5
        assert_eq!(
            params.reward_amounts,
            vec![Amount::from(3007i64), Amount::from(5000i64)]
        );
        assert_eq!(params.liquidity, Amount::from(1000i64));
        assert_eq!(params.meta, vec!["-60".to_string(), "60".to_string()]);
    }

    #[tokio::test]
    async fn test_burned_nft_is_read_error() {
        let chain = Arc::new(MockChain::new().with_slot0(addr(0xdd), get_sqrt_ratio_at_tick(0).unwrap(), 0));
        let err = ConcentratedValuer::new(chain)
            .value_nft(&pool_investment(), &addr(0x11), "404")
            .await
            .unwrap_err();
        assert!(matches!(err, ReadError::Reverted(_)));
    }
}
