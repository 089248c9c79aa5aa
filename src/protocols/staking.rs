//! Liquid-staking rebasing tokens.
//!
//! Holders own shares; their balance is `shares * total_pooled /
//! total_shares`. The investment meta keeps the last seen rate as
//! `[total_pooled, total_shares]` so a rebase can be priced against it.

use crate::chain::{PositionValuer, ReadError, StakingReads};
use crate::domain::{Address, Amount, Investment, InvestmentTokens, Position, PositionKind, PositionParams};
use crate::engine::{rebase_reward, ShareRate};
use crate::error::MathError;
use crate::orchestration::InvestmentHelper;
use async_trait::async_trait;
use ethnum::U256;
use std::sync::Arc;

/// Investment meta slots for `rate`.
pub fn rate_meta(rate: ShareRate) -> Vec<String> {
    vec![rate.total_pooled.to_string(), rate.total_shares.to_string()]
}

/// Rate stored in the investment meta, if it parses.
pub fn stored_rate(investment: &Investment) -> Option<ShareRate> {
    match investment.meta.as_slice() {
        [pooled, shares, ..] => Some(ShareRate::new(
            U256::from_str_radix(pooled, 10).ok()?,
            U256::from_str_radix(shares, 10).ok()?,
        )),
        _ => None,
    }
}

/// Signed reward a holder of `balance` earned moving from `before` to `after`.
pub fn rebase_delta(balance: &Amount, before: ShareRate, after: ShareRate) -> Result<Amount, MathError> {
    let balance = balance.to_unsigned().ok_or(MathError::NegativeBalance)?;
    rebase_reward(balance, before, after)
}

#[derive(Debug, Clone)]
pub struct StakingToken {
    protocol_name: String,
    token: Address,
    reads: Arc<dyn StakingReads>,
}

impl StakingToken {
    pub fn new(protocol_name: impl Into<String>, token: Address, reads: Arc<dyn StakingReads>) -> Self {
        Self {
            protocol_name: protocol_name.into(),
            token,
            reads,
        }
    }
}

#[async_trait]
impl InvestmentHelper for StakingToken {
    fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    fn investment_address(&self) -> Address {
        self.token
    }

    /// Stakers deposit the native token, represented by the zero address.
    async fn get_tokens(&self) -> Result<InvestmentTokens, ReadError> {
        let rate = share_rate(self.reads.as_ref(), &self.token).await?;
        Ok(InvestmentTokens::new(vec![Address::ZERO], Vec::new(), rate_meta(rate)))
    }
}

async fn share_rate(reads: &dyn StakingReads, token: &Address) -> Result<ShareRate, ReadError> {
    Ok(ShareRate::new(
        reads.total_pooled(token).await?,
        reads.total_shares(token).await?,
    ))
}

#[derive(Debug, Clone)]
pub struct StakingValuer {
    reads: Arc<dyn StakingReads>,
}

impl StakingValuer {
    pub fn new(reads: Arc<dyn StakingReads>) -> Self {
        Self { reads }
    }

    pub async fn share_rate(&self, token: &Address) -> Result<ShareRate, ReadError> {
        share_rate(self.reads.as_ref(), token).await
    }

    /// Pooled balance of `owner`; position meta holds the raw share count.
    pub async fn value_owner(&self, investment: &Investment, owner: &Address) -> Result<PositionParams, ReadError> {
        let token = &investment.address;
        let shares = self.reads.shares_of(token, owner).await?;
        let rate = self.share_rate(token).await?;
        let pooled = rate.pooled_for(shares)?;
        Ok(
            PositionParams::new(*owner, PositionKind::Invest, vec![Amount::from_unsigned(pooled)?])
                .with_meta(vec![shares.to_string()]),
        )
    }
}

#[async_trait]
impl PositionValuer for StakingValuer {
    async fn current_value(
        &self,
        investment: &Investment,
        position: &Position,
    ) -> Result<PositionParams, ReadError> {
        self.value_owner(investment, &position.owner).await
    }
}
