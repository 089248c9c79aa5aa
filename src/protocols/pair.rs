//! Constant-product AMM pairs.
//!
//! The pair contract is the investment and its LP token is the position.
//! A holder's share of the pool is `reserve_i * lp_balance / total_supply`
//! for each side. Investment meta keeps the reserves seen at creation.

use crate::chain::{PairReads, PositionValuer, ReadError};
use crate::domain::{Address, Amount, Investment, InvestmentTokens, Position, PositionKind, PositionParams};
use crate::engine::liquidity::mul_div;
use crate::error::MathError;
use crate::orchestration::InvestmentHelper;
use async_trait::async_trait;
use ethnum::U256;
use std::sync::Arc;

/// Underlying amounts of `lp` pool tokens; an empty pool is worth nothing.
pub fn lp_amounts(reserves: (U256, U256), lp: U256, total_supply: U256) -> Result<(U256, U256), MathError> {
    if total_supply == U256::ZERO {
        return Ok((U256::ZERO, U256::ZERO));
    }
    Ok((
        mul_div(reserves.0, lp, total_supply)?,
        mul_div(reserves.1, lp, total_supply)?,
    ))
}

#[derive(Debug, Clone)]
pub struct PairPool {
    protocol_name: String,
    pair: Address,
    reads: Arc<dyn PairReads>,
}

impl PairPool {
    pub fn new(protocol_name: impl Into<String>, pair: Address, reads: Arc<dyn PairReads>) -> Self {
        Self {
            protocol_name: protocol_name.into(),
            pair,
            reads,
        }
    }
}

#[async_trait]
impl InvestmentHelper for PairPool {
    fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    fn investment_address(&self) -> Address {
        self.pair
    }

    async fn get_tokens(&self) -> Result<InvestmentTokens, ReadError> {
        let (token0, token1) = self.reads.pair_tokens(&self.pair).await?;
        let (reserve0, reserve1) = self.reads.reserves(&self.pair).await?;
        Ok(InvestmentTokens::new(
            vec![token0, token1],
            Vec::new(),
            vec![reserve0.to_string(), reserve1.to_string()],
        ))
    }
}

#[derive(Debug, Clone)]
pub struct PairValuer {
    reads: Arc<dyn PairReads>,
}

impl PairValuer {
    pub fn new(reads: Arc<dyn PairReads>) -> Self {
        Self { reads }
    }

    /// Underlying amounts of `lp` pool tokens at current reserves.
    pub async fn value_lp(&self, pair: &Address, lp: U256) -> Result<(U256, U256), ReadError> {
        let reserves = self.reads.reserves(pair).await?;
        let total_supply = self.reads.total_supply(pair).await?;
        Ok(lp_amounts(reserves, lp, total_supply)?)
    }

    /// Pool share of `owner`; position meta holds the raw LP balance.
    pub async fn value_owner(&self, investment: &Investment, owner: &Address) -> Result<PositionParams, ReadError> {
        let pair = &investment.address;
        let lp = self.reads.lp_balance(pair, owner).await?;
        let (amount0, amount1) = self.value_lp(pair, lp).await?;
        Ok(PositionParams::new(
            *owner,
            PositionKind::Invest,
            vec![Amount::from_unsigned(amount0)?, Amount::from_unsigned(amount1)?],
        )
        .with_meta(vec![lp.to_string()]))
    }
}

#[async_trait]
impl PositionValuer for PairValuer {
    async fn current_value(
        &self,
        investment: &Investment,
        position: &Position,
    ) -> Result<PositionParams, ReadError> {
        self.value_owner(investment, &position.owner).await
    }
}
