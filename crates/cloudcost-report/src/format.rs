//! Display rounding. Amounts are carried at full precision and only rounded
//! up here, at the point they are shown.

use rust_decimal::{Decimal, RoundingStrategy};

/// `$1.23`, rounded up to the cent.
pub fn dollars(amount: Decimal) -> String {
    dollars_dp(amount, 2)
}

/// Dollar amount rounded up to `dp` places.
pub fn dollars_dp(amount: Decimal, dp: u32) -> String {
    let rounded = amount.round_dp_with_strategy(dp, RoundingStrategy::ToPositiveInfinity);
    format!("${rounded:.prec$}", prec = dp as usize)
}

/// Round up to `dp` decimal places.
///
/// The value is first snapped to 6 places so float noise such as
/// `2200.0000000000005` does not push it up a whole step.
pub fn ceil_dp(value: f64, dp: i32) -> f64 {
    let snapped = (value * 1e6).round() / 1e6;
    let factor = 10f64.powi(dp);
    (snapped * factor).ceil() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn dollars_round_up() {
        assert_eq!(dollars(dec!(1.231)), "$1.24");
        assert_eq!(dollars(dec!(1.2)), "$1.20");
        assert_eq!(dollars(dec!(0)), "$0.00");
        assert_eq!(dollars_dp(dec!(0.0001), 3), "$0.001");
    }

    #[test]
    fn ceil_ignores_float_noise() {
        assert_eq!(ceil_dp(2200.0000000000005, 2), 2200.0);
        assert_eq!(ceil_dp(12.341, 2), 12.35);
        assert_eq!(ceil_dp(3.0, 2), 3.0);
    }
}
