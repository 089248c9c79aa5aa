//! Fee-growth accounting for range positions.
//!
//! Fee-growth counters are Q128.128 accumulators that are allowed to wrap,
//! so every difference here is a wrapping 256-bit subtraction.

use super::full_math::mul_div;
use crate::domain::amount::u256_string;
use crate::error::MathError;
use ethnum::U256;
use serde::{Deserialize, Serialize};

/// 2^128, the fixed-point unit of fee-growth counters.
pub const Q128: U256 = U256::from_words(1, 0);

/// Per-token fee growth pair (Q128.128).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeGrowth {
    #[serde(with = "u256_string")]
    pub token0: U256,
    #[serde(with = "u256_string")]
    pub token1: U256,
}

impl FeeGrowth {
    pub fn new(token0: U256, token1: U256) -> Self {
        FeeGrowth { token0, token1 }
    }

    pub fn wrapping_sub(self, rhs: FeeGrowth) -> FeeGrowth {
        FeeGrowth {
            token0: self.token0.wrapping_sub(rhs.token0),
            token1: self.token1.wrapping_sub(rhs.token1),
        }
    }
}

/// Owner-side state of one range position as stored by the position manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangePosition {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub fee_growth_inside_last: FeeGrowth,
    pub tokens_owed0: u128,
    pub tokens_owed1: u128,
}

/// Fee growth accumulated strictly inside `[tick_lower, tick_upper)`.
pub fn fee_growth_inside(
    tick_lower: i32,
    tick_upper: i32,
    tick_current: i32,
    global: FeeGrowth,
    lower_outside: FeeGrowth,
    upper_outside: FeeGrowth,
) -> FeeGrowth {
    let below = if tick_current >= tick_lower {
        lower_outside
    } else {
        global.wrapping_sub(lower_outside)
    };
    let above = if tick_current < tick_upper {
        upper_outside
    } else {
        global.wrapping_sub(upper_outside)
    };
    global.wrapping_sub(below).wrapping_sub(above)
}

/// Fees earned by `liquidity` between two fee-growth readings.
pub fn fees_of(last: FeeGrowth, current: FeeGrowth, liquidity: u128) -> Result<(U256, U256), MathError> {
    let growth = current.wrapping_sub(last);
    let liquidity = U256::from(liquidity);
    Ok((
        mul_div(growth.token0, liquidity, Q128)?,
        mul_div(growth.token1, liquidity, Q128)?,
    ))
}

/// Already-owed tokens plus fees accrued since the last checkpoint.
pub fn uncollected_fees(position: &RangePosition, current_inside: FeeGrowth) -> Result<(U256, U256), MathError> {
    let (fee0, fee1) = fees_of(
        position.fee_growth_inside_last,
        current_inside,
        position.liquidity,
    )?;
    let owed0 = U256::from(position.tokens_owed0)
        .checked_add(fee0)
        .ok_or(MathError::Overflow)?;
    let owed1 = U256::from(position.tokens_owed1)
        .checked_add(fee1)
        .ok_or(MathError::Overflow)?;
    Ok((owed0, owed1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn growth(t0: u128, t1: u128) -> FeeGrowth {
        FeeGrowth::new(U256::from(t0), U256::from(t1))
    }

    #[test]
    fn test_fees_of_simple() {
        // one unit of Q128 growth per liquidity
        let last = FeeGrowth::default();
        let current = FeeGrowth::new(Q128, Q128 * U256::from(2u32));
        let (f0, f1) = fees_of(last, current, 500).unwrap();
        assert_eq!(f0, U256::from(500u32));
        assert_eq!(f1, U256::from(1000u32));
    }

    #[test]
    fn test_fees_of_across_counter_wrap() {
        let last = FeeGrowth::new(U256::MAX - Q128 + U256::ONE, U256::ZERO);
        let current = FeeGrowth::new(Q128, U256::ZERO);
        // distance is 2 * Q128 through the wrap
        let (f0, _) = fees_of(last, current, 7).unwrap();
        assert_eq!(f0, U256::from(14u32));
    }

    #[test]
    fn test_inside_when_in_range() {
        let global = growth(100, 200);
        let lower = growth(10, 20);
        let upper = growth(30, 40);
        let inside = fee_growth_inside(-60, 60, 0, global, lower, upper);
        assert_eq!(inside, growth(60, 140));
    }

    #[test]
    fn test_inside_when_below_range() {
        let global = growth(100, 200);
        let lower = growth(90, 150);
        let upper = growth(5, 10);
        // below = global - lower_out, above = upper_out
        let inside = fee_growth_inside(-60, 60, -120, global, lower, upper);
        assert_eq!(inside, growth(85, 140));
    }

    #[test]
    fn test_inside_when_above_range() {
        let global = growth(100, 200);
        let lower = growth(10, 20);
        let upper = growth(30, 40);
        // below = lower_out, above = global - upper_out
        let inside = fee_growth_inside(-60, 60, 120, global, lower, upper);
        assert_eq!(inside, growth(20, 20));
    }

    #[test]
    fn test_uncollected_adds_owed() {
        let position = RangePosition {
            tick_lower: -60,
            tick_upper: 60,
            liquidity: 3,
            fee_growth_inside_last: FeeGrowth::default(),
            tokens_owed0: 5,
            tokens_owed1: 0,
        };
        let (f0, f1) = uncollected_fees(&position, FeeGrowth::new(Q128, Q128)).unwrap();
        assert_eq!(f0, U256::from(8u32));
        assert_eq!(f1, U256::from(3u32));
    }

    proptest! {
        #[test]
        fn prop_fees_invariant_under_counter_shift(
            last in any::<u128>(),
            step in any::<u64>(),
            shift_hi in any::<u128>(),
            shift_lo in any::<u128>(),
            liquidity in any::<u64>(),
        ) {
            let shift = U256::from_words(shift_hi, shift_lo);
            let base_last = FeeGrowth::new(U256::from(last), U256::from(last));
            let base_current = FeeGrowth::new(
                U256::from(last) + U256::from(step),
                U256::from(last) + U256::from(step),
            );
            let shifted_last = FeeGrowth::new(
                base_last.token0.wrapping_add(shift),
                base_last.token1.wrapping_add(shift),
            );
            let shifted_current = FeeGrowth::new(
                base_current.token0.wrapping_add(shift),
                base_current.token1.wrapping_add(shift),
            );
            let plain = fees_of(base_last, base_current, u128::from(liquidity)).unwrap();
            let wrapped = fees_of(shifted_last, shifted_current, u128::from(liquidity)).unwrap();
            prop_assert_eq!(plain, wrapped);
        }
    }
}
