//! Token amounts backing a concentrated-liquidity range.

use super::full_math::mul_div;
use super::tick_math::get_sqrt_ratio_at_tick;
use crate::error::MathError;
use ethnum::U256;

/// 2^96, the fixed-point unit of sqrt prices.
pub const Q96: U256 = U256::from_words(0, 1 << 96);

fn sorted(a: U256, b: U256) -> (U256, U256) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

/// Token0 for `liquidity` across `[sqrt_a, sqrt_b]`, rounded down.
pub fn get_amount0_for_liquidity(
    sqrt_a: U256,
    sqrt_b: U256,
    liquidity: u128,
) -> Result<U256, MathError> {
    let (sqrt_a, sqrt_b) = sorted(sqrt_a, sqrt_b);
    if sqrt_a == U256::ZERO {
        return Err(MathError::DivisionByZero);
    }
    let scaled = U256::from(liquidity) << 96u32;
    Ok(mul_div(scaled, sqrt_b - sqrt_a, sqrt_b)? / sqrt_a)
}

/// Token1 for `liquidity` across `[sqrt_a, sqrt_b]`, rounded down.
pub fn get_amount1_for_liquidity(
    sqrt_a: U256,
    sqrt_b: U256,
    liquidity: u128,
) -> Result<U256, MathError> {
    let (sqrt_a, sqrt_b) = sorted(sqrt_a, sqrt_b);
    mul_div(U256::from(liquidity), sqrt_b - sqrt_a, Q96)
}

/// Both token amounts for `liquidity` at the current `sqrt_price`.
///
/// At or below the lower bound the range is all token0; at or above the
/// upper bound it is all token1.
pub fn get_amounts_for_liquidity(
    sqrt_price: U256,
    sqrt_a: U256,
    sqrt_b: U256,
    liquidity: u128,
) -> Result<(U256, U256), MathError> {
    let (sqrt_a, sqrt_b) = sorted(sqrt_a, sqrt_b);

    if sqrt_price <= sqrt_a {
        Ok((get_amount0_for_liquidity(sqrt_a, sqrt_b, liquidity)?, U256::ZERO))
    } else if sqrt_price < sqrt_b {
        Ok((
            get_amount0_for_liquidity(sqrt_price, sqrt_b, liquidity)?,
            get_amount1_for_liquidity(sqrt_a, sqrt_price, liquidity)?,
        ))
    } else {
        Ok((U256::ZERO, get_amount1_for_liquidity(sqrt_a, sqrt_b, liquidity)?))
    }
}

/// Principal `(amount0, amount1)` of a range position.
pub fn principal_of(
    tick_lower: i32,
    tick_upper: i32,
    liquidity: u128,
    sqrt_price_x96: U256,
) -> Result<(U256, U256), MathError> {
    if liquidity == 0 {
        return Ok((U256::ZERO, U256::ZERO));
    }
    let sqrt_a = get_sqrt_ratio_at_tick(tick_lower)?;
    let sqrt_b = get_sqrt_ratio_at_tick(tick_upper)?;
    get_amounts_for_liquidity(sqrt_price_x96, sqrt_a, sqrt_b, liquidity)
}
