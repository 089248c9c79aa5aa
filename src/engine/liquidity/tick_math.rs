//! Tick to sqrt-price conversion, bit-exact with the on-chain TickMath library.

use crate::error::MathError;
use ethnum::U256;

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = 887272;

/// `get_sqrt_ratio_at_tick(MIN_TICK)`.
pub const MIN_SQRT_RATIO: U256 = U256::new(4295128739);
/// `get_sqrt_ratio_at_tick(MAX_TICK)`.
pub const MAX_SQRT_RATIO: U256 =
    U256::from_words(0xfffd8963, 0xefd1fc6a506488495d951d5263988d26);

/// Q128.128 factors `sqrt(1.0001)^-(2^i)` for bits 1..=19 of |tick|.
const RATIO_STEPS: [(u32, u128); 19] = [
    (0x2, 0xfff97272373d413259a46990580e213a),
    (0x4, 0xfff2e50f5f656932ef12357cf3c7fdcc),
    (0x8, 0xffe5caca7e10e4e61c3624eaa0941cd0),
    (0x10, 0xffcb9843d60f6159c9db58835c926644),
    (0x20, 0xff973b41fa98c081472e6896dfb254c0),
    (0x40, 0xff2ea16466c96a3843ec78b326b52861),
    (0x80, 0xfe5dee046a99a2a811c461f1969c3053),
    (0x100, 0xfcbe86c7900a88aedcffc83b479aa3a4),
    (0x200, 0xf987a7253ac413176f2b074cf7815e54),
    (0x400, 0xf3392b0822b70005940c7a398e4b70f3),
    (0x800, 0xe7159475a2c29b7443b29c7fa6e889d9),
    (0x1000, 0xd097f3bdfd2022b8845ad8f792aa5825),
    (0x2000, 0xa9f746462d870fdf8a65dc1f90e061e5),
    (0x4000, 0x70d869a156d2a1b890bb3df62baf32f7),
    (0x8000, 0x31be135f97d08fd981231505542fcfa6),
    (0x10000, 0x09aa508b5b7a84e1c677de54f3e99bc9),
    (0x20000, 0x005d6af8dedb81196699c329225ee604),
    (0x40000, 0x00002216e584f5fa1ea926041bedfe98),
    (0x80000, 0x00000000048a170391f7dc42444e8fa2),
];

const RATIO_BIT0: u128 = 0xfffcb933bd6fad37aa2d162d1a594001;

/// `sqrt(1.0001^tick) * 2^96` as a Q64.96, rounded up.
///
/// # Errors
/// `TickOutOfRange` when `|tick| > MAX_TICK`.
pub fn get_sqrt_ratio_at_tick(tick: i32) -> Result<U256, MathError> {
    let abs_tick = tick.unsigned_abs();
    if abs_tick > MAX_TICK.unsigned_abs() {
        return Err(MathError::TickOutOfRange(tick));
    }

    let mut ratio = if abs_tick & 0x1 != 0 {
        U256::new(RATIO_BIT0)
    } else {
        U256::ONE << 128u32
    };
    for (bit, factor) in RATIO_STEPS {
        if abs_tick & bit != 0 {
            // ratio <= 2^128 and factor < 2^128, so the product fits.
            ratio = (ratio * U256::new(factor)) >> 128u32;
        }
    }

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 -> Q128.96, rounding up.
    let round = if ratio & U256::new(0xffff_ffff) != U256::ZERO {
        U256::ONE
    } else {
        U256::ZERO
    };
    Ok((ratio >> 32u32) + round)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> U256 {
        U256::from_str_radix(s, 10).unwrap()
    }

    #[test]
    fn test_bounds() {
        assert_eq!(get_sqrt_ratio_at_tick(MIN_TICK).unwrap(), MIN_SQRT_RATIO);
        assert_eq!(get_sqrt_ratio_at_tick(MAX_TICK).unwrap(), MAX_SQRT_RATIO);
        assert_eq!(
            MAX_SQRT_RATIO,
            dec("1461446703485210103287273052203988822378723970342")
        );
    }

    #[test]
    fn test_tick_zero_is_q96_one() {
        assert_eq!(get_sqrt_ratio_at_tick(0).unwrap(), U256::ONE << 96u32);
    }

    #[test]
    fn test_unit_ticks() {
        assert_eq!(
            get_sqrt_ratio_at_tick(1).unwrap(),
            dec("79232123823359799118286999568")
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(-1).unwrap(),
            dec("79224201403219477170569942574")
        );
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(
            get_sqrt_ratio_at_tick(MAX_TICK + 1),
            Err(MathError::TickOutOfRange(MAX_TICK + 1))
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(MIN_TICK - 1),
            Err(MathError::TickOutOfRange(MIN_TICK - 1))
        );
    }

    #[test]
    fn test_monotonic_in_tick() {
        let ticks = [-887272, -500000, -60, -1, 0, 1, 60, 500000, 887272];
        let ratios: Vec<U256> = ticks
            .iter()
            .map(|t| get_sqrt_ratio_at_tick(*t).unwrap())
            .collect();
        assert!(ratios.windows(2).all(|w| w[0] < w[1]));
    }
}
