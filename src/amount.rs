use num_bigint::BigUint;
use num_traits::Zero;

/// Token granularity used when the session does not configure one.
pub const DEFAULT_TOKEN_DECIMALS: u32 = 18;

/// Render an integer base-unit amount as a human-readable decimal string.
///
/// Exact at any magnitude: the value is split with integer arithmetic, never
/// routed through floating point. Trailing fractional zeros are trimmed, so
/// `1_500_000_000_000_000_000` at 18 decimals renders as `"1.5"`.
pub fn format_units(amount: &BigUint, decimals: u32) -> String {
    if decimals == 0 {
        return amount.to_string();
    }

    let base = BigUint::from(10u8).pow(decimals);
    let integer = amount / &base;
    let fraction = amount % &base;

    if fraction.is_zero() {
        return integer.to_string();
    }

    let fraction = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    format!("{}.{}", integer, fraction.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn units(n: u128) -> BigUint {
        BigUint::from(n)
    }

    #[test]
    fn test_format_whole_tokens() {
        assert_eq!(format_units(&units(1_000_000_000_000_000_000), 18), "1");
        assert_eq!(format_units(&units(25_000_000_000), 9), "25");
    }

    #[test]
    fn test_format_fractional() {
        assert_eq!(format_units(&units(1_500_000_000_000_000_000), 18), "1.5");
        assert_eq!(format_units(&units(1), 18), "0.000000000000000001");
        assert_eq!(format_units(&units(1_234_567_890), 9), "1.23456789");
    }

    #[test]
    fn test_format_zero() {
        assert_eq!(format_units(&BigUint::zero(), 18), "0");
        assert_eq!(format_units(&BigUint::zero(), 0), "0");
    }

    #[test]
    fn test_zero_decimals_passthrough() {
        assert_eq!(format_units(&units(42), 0), "42");
    }

    #[test]
    fn test_exceeds_u64_precision() {
        // 2^64 is ~1.8e19; this value cannot survive an f64 round-trip
        let amount = BigUint::parse_bytes(b"123456789012345678901234567890", 10).unwrap();
        assert_eq!(
            format_units(&amount, 18),
            "123456789012.34567890123456789"
        );
    }

    proptest! {
        #[test]
        fn prop_whole_multiples_have_no_fraction(n in 0u64..1_000_000, decimals in 0u32..24) {
            let base = BigUint::from(10u8).pow(decimals);
            let amount = BigUint::from(n) * &base;
            prop_assert_eq!(format_units(&amount, decimals), n.to_string());
        }

        #[test]
        fn prop_never_ends_in_trailing_zero_fraction(n in 1u128..u128::MAX, decimals in 1u32..24) {
            let rendered = format_units(&BigUint::from(n), decimals);
            if rendered.contains('.') {
                prop_assert!(!rendered.ends_with('0'));
                prop_assert!(!rendered.ends_with('.'));
            }
        }
    }
}
