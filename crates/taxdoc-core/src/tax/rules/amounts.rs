//! Amount parsing and formatting for US-style figures.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Parse a US-formatted amount (e.g. "54,000.00", "$6200", "150.00.").
///
/// Thousands separators, currency symbols and trailing punctuation are
/// dropped. Returns `None` for anything that is not a single decimal number.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .trim()
        .trim_start_matches('$')
        .trim_end_matches(|c: char| !c.is_ascii_digit())
        .chars()
        .filter(|c| *c != ',')
        .collect();

    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    Decimal::from_str(&cleaned).ok()
}

/// Round to cents, halves away from zero.
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format with two decimals and comma thousands separators (54,000.00).
pub fn format_amount(amount: Decimal) -> String {
    let s = format!("{:.2}", round_cents(amount));
    let (sign, s) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };
    let Some((integer_part, decimal_part)) = s.split_once('.') else {
        return format!("{sign}{s}");
    };

    // Add thousand separators
    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(*c);
    }

    format!("{}{}.{}", sign, formatted, decimal_part)
}

/// Format a percentage with two decimals ("11.42%").
pub fn format_percent(value: Decimal) -> String {
    format!("{:.2}%", round_cents(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("54,000.00"), Some(dec("54000.00")));
        assert_eq!(parse_amount("6200.00"), Some(dec("6200.00")));
        assert_eq!(parse_amount("$1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("150.00."), Some(dec("150.00")));
        assert_eq!(parse_amount("6200"), Some(dec("6200")));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("12.34.56"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("1O0.00"), None);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec("54000")), "54,000.00");
        assert_eq!(format_amount(dec("1234.56")), "1,234.56");
        assert_eq!(format_amount(dec("12345678.9")), "12,345,678.90");
        assert_eq!(format_amount(dec("999.999")), "1,000.00");
        assert_eq!(format_amount(Decimal::ZERO), "0.00");
        assert_eq!(format_amount(dec("-1602")), "-1,602.00");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(dec("11.423602")), "11.42%");
        assert_eq!(format_percent(Decimal::ZERO), "0.00%");
    }
}
