//! Concentrated-liquidity valuation: tick math, range amounts, fee growth.

pub mod amounts;
pub mod fees;
pub mod full_math;
pub mod tick_math;

pub use amounts::{get_amounts_for_liquidity, principal_of, Q96};
pub use fees::{fee_growth_inside, fees_of, uncollected_fees, FeeGrowth, RangePosition, Q128};
pub use full_math::mul_div;
pub use tick_math::{get_sqrt_ratio_at_tick, MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK};
