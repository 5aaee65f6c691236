//! Date axis of the daily chart.

use chrono::{Days, NaiveDate};

use super::format::format_nasa_date;

/// Parses a compact (`20240101`) or dashed (`2024-01-01`) date
#[must_use]
pub fn parse_range_date(token: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format_nasa_date(token.trim()), "%Y-%m-%d").ok()
}

/// First date of an analyze range such as `20240101 a 20240110`
#[must_use]
pub fn range_start(range: &str) -> Option<NaiveDate> {
    range.split_whitespace().next().and_then(parse_range_date)
}

/// `length` consecutive `YYYY-MM-DD` labels starting at the range start.
///
/// Falls back to positional labels `"1"`, `"2"`, ... when the start date
/// cannot be parsed, so the axis always has one label per value.
#[must_use]
pub fn build_dates(range: &str, length: usize) -> Vec<String> {
    let Some(start) = range_start(range) else {
        return (1..=length).map(|index| index.to_string()).collect();
    };

    (0..length)
        .map(|offset| {
            start
                .checked_add_days(Days::new(offset as u64))
                .map_or_else(|| (offset + 1).to_string(), |day| day.format("%Y-%m-%d").to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_range() {
        assert_eq!(
            build_dates("20240101 a 20240103", 3),
            vec!["2024-01-01", "2024-01-02", "2024-01-03"]
        );
    }

    #[test]
    fn test_dashed_range_crosses_month_end() {
        assert_eq!(
            build_dates("2024-02-28 to 2024-03-01", 3),
            vec!["2024-02-28", "2024-02-29", "2024-03-01"]
        );
    }

    #[test]
    fn test_unparseable_range_falls_back_to_positions() {
        assert_eq!(build_dates("sin rango", 2), vec!["1", "2"]);
        assert_eq!(build_dates("", 2), vec!["1", "2"]);
    }

    #[test]
    fn test_length_is_independent_of_range_end() {
        assert_eq!(build_dates("20240101 a 20240103", 5).len(), 5);
        assert!(build_dates("20240101 a 20240103", 0).is_empty());
    }
}
