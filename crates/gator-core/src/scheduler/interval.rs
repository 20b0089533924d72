use std::time::Duration;

use crate::{Error, Result};

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Parse a polling interval such as `"1m"`, `"30s"`, `"1h30m"` or `"1.5s"`.
///
/// Accepts one or more `<number><unit>` pairs with units `ns`, `us` (or
/// `µs`), `ms`, `s`, `m` and `h`. The result must be strictly positive.
pub fn parse_interval(input: &str) -> Result<Duration> {
    let invalid = |reason: &str| Error::InvalidInterval {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(invalid("empty duration"));
    }

    match rest.as_bytes()[0] {
        b'-' => return Err(invalid("interval must be positive")),
        b'+' => rest = &rest[1..],
        _ => {}
    }

    // A bare zero is valid syntax but not a usable interval
    if rest == "0" {
        return Err(invalid("interval must be positive"));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let (number, after) = rest.split_at(number_len);

        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, after) = after.split_at(unit_len);

        if unit.is_empty() {
            return Err(invalid("missing unit"));
        }
        let unit_nanos = unit_in_nanos(unit)
            .ok_or_else(|| invalid(&format!("unknown unit {:?}", unit)))?;
        let nanos = scale(number, unit_nanos).ok_or_else(|| invalid("invalid number"))?;

        total = total
            .checked_add(nanos)
            .ok_or_else(|| invalid("interval is too large"))?;
        rest = after;
    }

    if total == 0 {
        return Err(invalid("interval must be positive"));
    }

    let nanos = u64::try_from(total).map_err(|_| invalid("interval is too large"))?;
    Ok(Duration::from_nanos(nanos))
}

fn unit_in_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// `number * unit_nanos` for a decimal like `"1.5"`, truncated to whole nanoseconds
fn scale(number: &str, unit_nanos: u128) -> Option<u128> {
    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (number, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if fraction.contains('.') {
        return None;
    }

    let whole_value: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole_value.checked_mul(unit_nanos)?;

    // Digits past nanosecond precision cannot change the result
    let fraction = &fraction[..fraction.len().min(18)];
    if !fraction.is_empty() {
        let digits: u128 = fraction.parse().ok()?;
        let denominator = 10u128.pow(fraction.len() as u32);
        nanos = nanos.checked_add(digits.checked_mul(unit_nanos)? / denominator)?;
    }

    Some(nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_units() {
        assert_eq!(parse_interval("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_interval("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_interval("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_interval("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_interval("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_interval("10µs").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_interval("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn test_compound_and_decimal() {
        assert_eq!(parse_interval("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_interval("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_interval("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_interval(".5m").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_interval("+10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_interval(" 5s ").unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_non_positive() {
        for input in ["0", "0s", "0m0s", "-1m", "-5s"] {
            let err = parse_interval(input).unwrap_err();
            assert!(
                matches!(err, Error::InvalidInterval { .. }),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_malformed() {
        for input in ["", "abc", "10", "5 s", "1d", "1..5s", "s", ".s", "1.2.3s"] {
            assert!(parse_interval(input).is_err(), "{input:?} should be rejected");
        }
    }

    #[test]
    fn test_error_names_input() {
        let err = parse_interval("1d").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("\"1d\""));
        assert!(message.contains("unknown unit"));
    }
}
