//! Index-delta reward accrual.
//!
//! Lending markets publish a monotonically increasing global index; a user
//! earns `balance * (global - stored) / scale` since their last checkpoint.

use crate::domain::Amount;
use crate::engine::liquidity::mul_div;
use crate::error::MathError;
use ethnum::U256;
use serde::{Deserialize, Serialize};

/// Rewards owed to `balance` for the index moving from `stored_index` to
/// `global_index`.
///
/// # Errors
/// `IndexRegression` when the global index is below the stored one,
/// `DivisionByZero` for a zero scale.
pub fn reward_delta(
    balance: U256,
    global_index: U256,
    stored_index: U256,
    index_scale: U256,
) -> Result<U256, MathError> {
    if global_index < stored_index {
        return Err(MathError::IndexRegression);
    }
    mul_div(balance, global_index - stored_index, index_scale)
}

/// Per-user checkpoint: the last index seen and rewards accrued so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewardAccrual {
    pub stored_index: U256,
    pub accrued: U256,
}

impl RewardAccrual {
    pub fn new(stored_index: U256, accrued: U256) -> Self {
        RewardAccrual {
            stored_index,
            accrued,
        }
    }
}

/// Advance a checkpoint to `global_index`.
///
/// The delta is taken against the pre-update index; the index is replaced
/// only once the delta has been added.
pub fn accrue(
    state: RewardAccrual,
    balance: U256,
    global_index: U256,
    index_scale: U256,
) -> Result<RewardAccrual, MathError> {
    let delta = reward_delta(balance, global_index, state.stored_index, index_scale)?;
    let accrued = state
        .accrued
        .checked_add(delta)
        .ok_or(MathError::Overflow)?;
    Ok(RewardAccrual {
        stored_index: global_index,
        accrued,
    })
}

/// Pooled-to-shares ratio of a rebasing token at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRate {
    #[serde(with = "crate::domain::amount::u256_string")]
    pub total_pooled: U256,
    #[serde(with = "crate::domain::amount::u256_string")]
    pub total_shares: U256,
}

impl ShareRate {
    pub fn new(total_pooled: U256, total_shares: U256) -> Self {
        ShareRate {
            total_pooled,
            total_shares,
        }
    }

    /// Pooled value of `shares` at this rate.
    pub fn pooled_for(&self, shares: U256) -> Result<U256, MathError> {
        if self.total_shares == U256::ZERO {
            return Ok(U256::ZERO);
        }
        mul_div(shares, self.total_pooled, self.total_shares)
    }
}

/// Reward of `balance` from a share-rate rebase, negative on slashing:
/// `balance * (pooled_after * shares_before - pooled_before * shares_after)
///   / (pooled_before * shares_after)`.
pub fn rebase_reward(balance: U256, before: ShareRate, after: ShareRate) -> Result<Amount, MathError> {
    let grown = after
        .total_pooled
        .checked_mul(before.total_shares)
        .ok_or(MathError::Overflow)?;
    let base = before
        .total_pooled
        .checked_mul(after.total_shares)
        .ok_or(MathError::Overflow)?;
    if base == U256::ZERO {
        return Err(MathError::DivisionByZero);
    }

    if grown >= base {
        Amount::from_unsigned(mul_div(balance, grown - base, base)?)
    } else {
        Ok(-Amount::from_unsigned(mul_div(balance, base - grown, base)?)?)
    }
}
