//! Annualized distribution yield.

use crate::data::provider::DataError;

/// Decimal places used for yields and prices in output files.
pub const DISPLAY_PLACES: u32 = 3;

/// `amount * frequency / price * 100`, at full precision.
///
/// `price` must be finite and strictly positive, `amount` finite and
/// non-negative, and `frequency` at least one payment per year.
pub fn annualized_yield(amount: f64, frequency: u32, price: f64) -> Result<f64, DataError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(DataError::InvalidInput(format!(
            "price must be positive, got {price}"
        )));
    }
    if !amount.is_finite() || amount < 0.0 {
        return Err(DataError::InvalidInput(format!(
            "distribution amount must be non-negative, got {amount}"
        )));
    }
    if frequency == 0 {
        return Err(DataError::InvalidInput(
            "frequency must be at least one payment per year".into(),
        ));
    }

    Ok(amount * f64::from(frequency) / price * 100.0)
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monthly_example() {
        let y = annualized_yield(1.0, 12, 100.0).unwrap();
        assert!((y - 12.0).abs() < 1e-12);
    }

    #[test]
    fn quarterly_example() {
        let y = annualized_yield(2.0, 4, 50.0).unwrap();
        assert!((y - 16.0).abs() < 1e-12);
    }

    #[test]
    fn zero_amount_is_zero_yield() {
        assert_eq!(annualized_yield(0.0, 52, 17.3).unwrap(), 0.0);
    }

    #[test]
    fn rejects_non_positive_price() {
        assert!(matches!(
            annualized_yield(1.0, 12, 0.0),
            Err(DataError::InvalidInput(_))
        ));
        assert!(matches!(
            annualized_yield(1.0, 12, -5.0),
            Err(DataError::InvalidInput(_))
        ));
        assert!(matches!(
            annualized_yield(1.0, 12, f64::NAN),
            Err(DataError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_negative_amount() {
        assert!(matches!(
            annualized_yield(-0.1, 12, 10.0),
            Err(DataError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_zero_frequency() {
        assert!(matches!(
            annualized_yield(0.1, 0, 10.0),
            Err(DataError::InvalidInput(_))
        ));
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(12.34567, 3), 12.346);
        assert_eq!(round_to(12.34567, 2), 12.35);
        assert_eq!(round_to(-1.0005, 0), -1.0);
    }
}
