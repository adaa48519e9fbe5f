//! Locale-aware number parsing for back-office figures.
//!
//! Chilean and Argentine portals print `$ 1.234.567` for amounts (dot as
//! thousands separator, comma as decimal separator). Ticketmaster B2B prints
//! US-style `1,234.50`. Everything funnels through here.

use serde::{Deserialize, Serialize};

/// Number formatting convention of a portal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberLocale {
    /// `1.234.567,89`
    #[default]
    Latam,
    /// `1,234,567.89`
    Us,
}

impl NumberLocale {
    fn separators(&self) -> (char, char) {
        match self {
            NumberLocale::Latam => ('.', ','),
            NumberLocale::Us => (',', '.'),
        }
    }
}

/// Parses a monetary amount or decimal figure.
///
/// Returns `None` for empty cells, dashes and text without digits.
pub fn parse_amount(text: &str, locale: NumberLocale) -> Option<f64> {
    let trimmed = text.trim();
    let negative = trimmed.starts_with('-')
        || (trimmed.starts_with('(') && trimmed.ends_with(')'))
        || trimmed.contains("$-")
        || trimmed.contains("$ -");

    let cleaned: String =
        trimmed.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',').collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let value = normalize_digits(&cleaned, locale)?;
    Some(if negative { -value } else { value })
}

/// Converts a digits-and-separators string to f64 under the given locale.
fn normalize_digits(cleaned: &str, locale: NumberLocale) -> Option<f64> {
    let (thousands, decimal) = locale.separators();

    let normalized = if cleaned.contains(decimal) {
        // 1.234,56 -> 1234.56 (Latam) / 1,234.56 -> 1234.56 (US)
        let (int_part, frac_part) = cleaned.rsplit_once(decimal)?;
        let int_digits: String = int_part.chars().filter(|c| c.is_ascii_digit()).collect();
        let frac_digits: String = frac_part.chars().filter(|c| c.is_ascii_digit()).collect();
        format!("{}.{}", if int_digits.is_empty() { "0" } else { &int_digits }, frac_digits)
    } else if cleaned.contains(thousands) && !is_grouped(cleaned, thousands) {
        // "1.5" under Latam is a decimal someone typed US-style
        let (int_part, frac_part) = cleaned.rsplit_once(thousands)?;
        format!("{}.{}", int_part.replace(thousands, ""), frac_part)
    } else {
        cleaned.replace(thousands, "")
    };

    normalized.trim_end_matches('.').parse().ok()
}

/// True when every group after the first separator is exactly three digits.
fn is_grouped(text: &str, separator: char) -> bool {
    let mut parts = text.split(separator);
    let first = parts.next().unwrap_or_default();
    if first.is_empty() || first.len() > 3 {
        return false;
    }
    parts.all(|group| group.len() == 3 && group.chars().all(|c| c.is_ascii_digit()))
}

/// Parses an integer ticket count, ignoring thousands separators.
///
/// A trailing group of one or two digits is a decimal part and is dropped:
/// "1.234,00" is 1234 and "12,5" is 12.
pub fn parse_count(text: &str) -> Option<i64> {
    let trimmed = text.trim();

    let integral = match trimmed.rsplit_once([',', '.']) {
        Some((head, tail))
            if (1..=2).contains(&tail.len()) && tail.chars().all(|c| c.is_ascii_digit()) =>
        {
            head
        }
        _ => trimmed,
    };

    let digits: String = integral.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    let value: i64 = digits.parse().ok()?;
    Some(if integral.starts_with('-') { -value } else { value })
}

/// Parses a percentage cell like "85,3 %" into 85.3.
pub fn parse_percentage(text: &str, locale: NumberLocale) -> Option<f64> {
    parse_amount(&text.replace('%', ""), locale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_latam() {
        let l = NumberLocale::Latam;
        assert_eq!(parse_amount("$ 1.234.567", l), Some(1234567.0));
        assert_eq!(parse_amount("$12.500", l), Some(12500.0));
        assert_eq!(parse_amount("1.234,56", l), Some(1234.56));
        assert_eq!(parse_amount("$ 1.234.567,50", l), Some(1234567.5));
        assert_eq!(parse_amount("ARS 45.000,00", l), Some(45000.0));
        assert_eq!(parse_amount("CLP $ 990", l), Some(990.0));
        assert_eq!(parse_amount("0,5", l), Some(0.5));
    }

    #[test]
    fn test_parse_amount_latam_dot_decimal_fallback() {
        let l = NumberLocale::Latam;
        assert_eq!(parse_amount("1.5", l), Some(1.5));
        assert_eq!(parse_amount("12.50", l), Some(12.5));
    }

    #[test]
    fn test_parse_amount_us() {
        let u = NumberLocale::Us;
        assert_eq!(parse_amount("$1,234.56", u), Some(1234.56));
        assert_eq!(parse_amount("1,234,567", u), Some(1234567.0));
        assert_eq!(parse_amount("99.90", u), Some(99.9));
    }

    #[test]
    fn test_parse_amount_negative() {
        assert_eq!(parse_amount("-1.000", NumberLocale::Latam), Some(-1000.0));
        assert_eq!(parse_amount("(2.500)", NumberLocale::Latam), Some(-2500.0));
        assert_eq!(parse_amount("$ -300", NumberLocale::Latam), Some(-300.0));
    }

    #[test]
    fn test_parse_amount_empty() {
        assert_eq!(parse_amount("", NumberLocale::Latam), None);
        assert_eq!(parse_amount("-", NumberLocale::Latam), None);
        assert_eq!(parse_amount("N/A", NumberLocale::Us), None);
        assert_eq!(parse_amount("$", NumberLocale::Latam), None);
    }

    #[test]
    fn test_parse_amount_nbsp() {
        assert_eq!(parse_amount("$\u{a0}3.200", NumberLocale::Latam), Some(3200.0));
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1.234"), Some(1234));
        assert_eq!(parse_count("1,234"), Some(1234));
        assert_eq!(parse_count(" 15 "), Some(15));
        assert_eq!(parse_count("1.234,00"), Some(1234));
        assert_eq!(parse_count("12,5"), Some(12));
        assert_eq!(parse_count("98.75"), Some(98));
        assert_eq!(parse_count("1.234.567"), Some(1_234_567));
        assert_eq!(parse_count("-3"), Some(-3));
        assert_eq!(parse_count("—"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn test_parse_percentage() {
        assert_eq!(parse_percentage("85,3 %", NumberLocale::Latam), Some(85.3));
        assert_eq!(parse_percentage("100%", NumberLocale::Latam), Some(100.0));
        assert_eq!(parse_percentage("42.5%", NumberLocale::Us), Some(42.5));
    }

    #[test]
    fn test_is_grouped() {
        assert!(is_grouped("1.234.567", '.'));
        assert!(is_grouped("12.500", '.'));
        assert!(!is_grouped("1.5", '.'));
        assert!(!is_grouped("1234.567", '.'));
    }
}
