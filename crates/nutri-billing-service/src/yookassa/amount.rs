//! Decimal amount conversion.

use super::YookassaError;

/// Convert a decimal amount string (`"99.00"`) to minor units (`9900`).
///
/// Accepts zero to two fraction digits. No floating point is involved.
///
/// # Errors
///
/// Returns `YookassaError::InvalidAmount` for signs, exponents, more than two
/// fraction digits, empty parts or overflow.
pub fn parse_minor_units(value: &str) -> Result<i64, YookassaError> {
    let invalid = || YookassaError::InvalidAmount(value.to_string());

    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (value, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !all_digits(whole) || !all_digits(fraction) {
        return Err(invalid());
    }
    if value.contains('.') && fraction.is_empty() {
        return Err(invalid());
    }

    let cents: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
        2 => fraction.parse().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    whole
        .parse::<i64>()
        .ok()
        .and_then(|w| w.checked_mul(100))
        .and_then(|w| w.checked_add(cents))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_exactly() {
        assert_eq!(parse_minor_units("99.00").unwrap(), 9900);
        assert_eq!(parse_minor_units("349.00").unwrap(), 34900);
        assert_eq!(parse_minor_units("10").unwrap(), 1000);
        assert_eq!(parse_minor_units("0.5").unwrap(), 50);
        assert_eq!(parse_minor_units("0.07").unwrap(), 7);
        assert_eq!(parse_minor_units("1234.56").unwrap(), 123_456);
    }

    #[test]
    fn rejects_bad_input() {
        for value in [
            "", ".50", "1.", "99.001", "-1.00", "+1.00", "1e3", "9 9", "99,00", "abc",
            "99999999999999999999.00",
        ] {
            assert!(parse_minor_units(value).is_err(), "{value}");
        }
    }
}
