//! Spanish date parsing for event listings and report headers.

use crate::parsing::text::strip_accents;
use chrono::NaiveDate;
use regex_lite::Regex;
use std::sync::LazyLock;

static NUMERIC_DMY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{4}|\d{2})\b").unwrap());

static ISO_YMD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})").unwrap());

static LONG_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+(?:de\s+)?([a-z]{3,10})\.?,?\s+(?:de\s+|del\s+)?(\d{4})\b")
        .unwrap()
});

/// Maps a Spanish month name or abbreviation to its number.
fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    let month = match name.get(..3)? {
        "ene" => 1,
        "feb" => 2,
        "mar" => 3,
        "abr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "ago" => 8,
        "sep" | "set" => 9,
        "oct" => 10,
        "nov" => 11,
        "dic" => 12,
        _ => return None,
    };
    Some(month)
}

fn expand_year(year: &str) -> Option<i32> {
    let value: i32 = year.parse().ok()?;
    Some(if year.len() == 2 { 2000 + value } else { value })
}

/// Extracts the first date found in `text`.
///
/// Accepts `15/03/2025`, `15-03-25`, `2025-03-15`, `15 de marzo de 2025`,
/// `sábado 15 mar 2025 21:00hs` and similar variants.
pub fn parse_spanish_date(text: &str) -> Option<NaiveDate> {
    let text = strip_accents(text);

    if let Some(caps) = ISO_YMD.captures(&text) {
        let date = NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
        if date.is_some() {
            return date;
        }
    }

    if let Some(caps) = NUMERIC_DMY.captures(&text) {
        let date = NaiveDate::from_ymd_opt(
            expand_year(&caps[3])?,
            caps[2].parse().ok()?,
            caps[1].parse().ok()?,
        );
        if date.is_some() {
            return date;
        }
    }

    for caps in LONG_FORM.captures_iter(&text) {
        let Some(month) = month_number(&caps[2]) else {
            continue;
        };
        if let Some(date) =
            NaiveDate::from_ymd_opt(caps[3].parse().ok()?, month, caps[1].parse().ok()?)
        {
            return Some(date);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_numeric_formats() {
        assert_eq!(parse_spanish_date("15/03/2025"), ymd(2025, 3, 15));
        assert_eq!(parse_spanish_date("5-3-2025"), ymd(2025, 3, 5));
        assert_eq!(parse_spanish_date("15.03.2025"), ymd(2025, 3, 15));
        assert_eq!(parse_spanish_date("15/03/25"), ymd(2025, 3, 15));
        assert_eq!(parse_spanish_date("Fecha: 01/12/2024 21:00"), ymd(2024, 12, 1));
    }

    #[test]
    fn test_iso_format() {
        assert_eq!(parse_spanish_date("2025-03-15"), ymd(2025, 3, 15));
        assert_eq!(parse_spanish_date("2025-03-15T21:00:00-03:00"), ymd(2025, 3, 15));
    }

    #[test]
    fn test_long_forms() {
        assert_eq!(parse_spanish_date("sábado 15 de marzo de 2025"), ymd(2025, 3, 15));
        assert_eq!(parse_spanish_date("15 mar 2025 21:00hs"), ymd(2025, 3, 15));
        assert_eq!(parse_spanish_date("Vie 7 Nov. 2025"), ymd(2025, 11, 7));
        assert_eq!(parse_spanish_date("3 de Septiembre del 2024"), ymd(2024, 9, 3));
        assert_eq!(parse_spanish_date("20 de agosto, 2025"), ymd(2025, 8, 20));
    }

    #[test]
    fn test_invalid_dates() {
        assert_eq!(parse_spanish_date(""), None);
        assert_eq!(parse_spanish_date("sin fecha"), None);
        assert_eq!(parse_spanish_date("31/02/2025"), None);
        assert_eq!(parse_spanish_date("15 de foo de 2025"), None);
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("enero"), Some(1));
        assert_eq!(month_number("Set"), Some(9));
        assert_eq!(month_number("diciembre"), Some(12));
        assert_eq!(month_number("xx"), None);
    }
}
