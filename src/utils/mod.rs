//! Utility functions for emote

use log::warn;
use std::env;
use std::str::FromStr;

/// Check if an environment variable is set to a truthy value
/// Accepts: "1", "true", "on", "yes", "t" (case insensitive)
pub fn is_env_true(key: &str) -> bool {
    match env::var(key) {
        Ok(val) => {
            let val_lower = val.to_lowercase();
            matches!(val_lower.as_str(), "1" | "true" | "on" | "yes" | "t")
        }
        Err(_) => false,
    }
}

/// Read and parse an environment variable; unparsable values are ignored with a warning
pub fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("⚠️ Ignoring {key}={raw:?}: not a valid value");
            None
        }
    }
}

/// C-style leading integer parse: optional sign, then digits, stop at the first
/// non-digit. No digits yields 0; out-of-range values saturate.
pub fn parse_leading_int(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value
            .saturating_mul(10)
            .saturating_add(i64::from(byte - b'0'));
    }

    if negative { -value } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("150"), 150);
        assert_eq!(parse_leading_int("-5"), -5);
        assert_eq!(parse_leading_int("  42%"), 42);
        assert_eq!(parse_leading_int("+7"), 7);
        assert_eq!(parse_leading_int("abc"), 0);
        assert_eq!(parse_leading_int(""), 0);
        assert_eq!(parse_leading_int("99999999999999999999999"), i64::MAX);
    }

    #[test]
    fn test_env_parse_missing_key() {
        assert_eq!(env_parse::<u32>("EMOTE_TEST_SURELY_UNSET_KEY"), None);
    }
}
