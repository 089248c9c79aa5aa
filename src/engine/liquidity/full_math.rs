//! 512-bit intermediate multiply-divide over U256.

use crate::error::MathError;
use ethnum::U256;

/// Full 512-bit product of `a * b` as `(high, low)`.
fn mul_wide(a: U256, b: U256) -> (U256, U256) {
    let (a1, a0) = a.into_words();
    let (b1, b0) = b.into_words();

    let p00 = U256::from(a0) * U256::from(b0);
    let p01 = U256::from(a0) * U256::from(b1);
    let p10 = U256::from(a1) * U256::from(b0);
    let p11 = U256::from(a1) * U256::from(b1);

    let mut hi = p11;
    let mid = p01.wrapping_add(p10);
    if mid < p01 {
        hi = hi.wrapping_add(U256::ONE << 128u32);
    }

    let lo = p00.wrapping_add(mid << 128u32);
    if lo < p00 {
        hi = hi.wrapping_add(U256::ONE);
    }
    hi = hi.wrapping_add(mid >> 128u32);

    (hi, lo)
}

/// Divide the 512-bit `(hi, lo)` by `d`, returning quotient and remainder.
fn div_wide(hi: U256, lo: U256, d: U256) -> Result<(U256, U256), MathError> {
    if d == U256::ZERO {
        return Err(MathError::DivisionByZero);
    }
    if hi == U256::ZERO {
        return Ok((lo / d, lo % d));
    }
    // Quotient must fit in 256 bits.
    if hi >= d {
        return Err(MathError::Overflow);
    }

    let mut rem = hi;
    let mut quot = U256::ZERO;
    for i in (0..256u32).rev() {
        let carry = rem >> 255u32;
        rem = (rem << 1u32) | ((lo >> i) & U256::ONE);
        if carry != U256::ZERO || rem >= d {
            rem = rem.wrapping_sub(d);
            quot |= U256::ONE << i;
        }
    }
    Ok((quot, rem))
}

/// `floor(a * b / denominator)` without intermediate overflow.
///
/// # Errors
/// `DivisionByZero` for a zero denominator, `Overflow` when the quotient
/// exceeds 256 bits.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    let (hi, lo) = mul_wide(a, b);
    div_wide(hi, lo, denominator).map(|(q, _)| q)
}
