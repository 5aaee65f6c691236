//! Session cache of hourly results keyed by a coarse fingerprint.
//!
//! Coordinates are rounded to 3 decimals (about 110 m), so two pins a few
//! metres apart share one entry. Entries live until the next accepted analyze
//! result clears the whole cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::models::{EventType, HourlyResponse};

/// Event component of the fingerprint when no event type is given
pub const NO_EVENT: &str = "all";

/// Fingerprint of a cached hourly result
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct HourlyKey {
    lat_milli: i64, // Lat * 1000
    lon_milli: i64, // Lon * 1000
    date: NaiveDate,
    event_type: Option<EventType>,
}

impl HourlyKey {
    #[must_use]
    pub fn new(lat: f64, lon: f64, date: NaiveDate, event_type: Option<EventType>) -> Self {
        // Coordinates have a limited range, the cast cannot overflow
        Self {
            lat_milli: (lat * 1000.0).round() as i64,
            lon_milli: (lon * 1000.0).round() as i64,
            date,
            event_type,
        }
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

fn write_milli(f: &mut fmt::Formatter<'_>, value: i64) -> fmt::Result {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    write!(f, "{sign}{}.{:03}", abs / 1000, abs % 1000)
}

impl fmt::Display for HourlyKey {
    /// `lat|lon|date|event`, e.g. `10.123|20.679|2024-05-01|viaje`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_milli(f, self.lat_milli)?;
        f.write_str("|")?;
        write_milli(f, self.lon_milli)?;
        write!(
            f,
            "|{}|{}",
            self.date.format("%Y-%m-%d"),
            self.event_type.map_or(NO_EVENT, EventType::as_str)
        )
    }
}

/// Unbounded map from fingerprint to hourly result
#[derive(Debug, Default, Clone)]
pub struct HourlyCache {
    entries: HashMap<HourlyKey, Arc<HourlyResponse>>,
}

impl HourlyCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, replacing any entry with the same fingerprint
    pub fn insert(&mut self, key: HourlyKey, value: Arc<HourlyResponse>) {
        tracing::debug!(key = %key, "Caching hourly result");
        self.entries.insert(key, value);
    }

    #[must_use]
    pub fn get(&self, key: &HourlyKey) -> Option<Arc<HourlyResponse>> {
        let hit = self.entries.get(key).cloned();
        if hit.is_some() {
            tracing::debug!(key = %key, "Hourly cache hit");
        } else {
            tracing::debug!(key = %key, "Hourly cache miss");
        }
        hit
    }

    pub fn clear(&mut self) {
        if !self.is_empty() {
            tracing::debug!(entries = self.len(), "Clearing hourly cache");
        }
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::hourly::fixtures::hourly_response;
    use rstest::rstest;

    fn may_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_nearby_pins_share_a_fingerprint() {
        let a = HourlyKey::new(10.12345, 20.6789, may_first(), Some(EventType::Viaje));
        let b = HourlyKey::new(10.1234, 20.6789, may_first(), Some(EventType::Viaje));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "10.123|20.679|2024-05-01|viaje");
    }

    #[rstest]
    #[case(10.12345, 20.6789, None, "10.123|20.679|2024-05-01|all")]
    #[case(-13.5319, -71.9681, Some(EventType::Boda), "-13.532|-71.968|2024-05-01|boda")]
    #[case(-0.0004, 0.0, None, "0.000|0.000|2024-05-01|all")]
    #[case(-0.25, 5.0, Some(EventType::Pesca), "-0.250|5.000|2024-05-01|pesca")]
    fn test_fingerprint_format(
        #[case] lat: f64,
        #[case] lon: f64,
        #[case] event: Option<EventType>,
        #[case] expected: &str,
    ) {
        assert_eq!(HourlyKey::new(lat, lon, may_first(), event).to_string(), expected);
    }

    #[test]
    fn test_event_and_date_are_part_of_the_fingerprint() {
        let base = HourlyKey::new(1.0, 2.0, may_first(), Some(EventType::Viaje));
        assert_ne!(base, HourlyKey::new(1.0, 2.0, may_first(), None));
        assert_ne!(
            base,
            HourlyKey::new(1.0, 2.0, may_first().succ_opt().unwrap(), Some(EventType::Viaje))
        );
    }

    #[test]
    fn test_insert_get_clear() {
        let mut cache = HourlyCache::new();
        let key = HourlyKey::new(1.0, 2.0, may_first(), None);
        assert!(cache.get(&key).is_none());

        cache.insert(key.clone(), Arc::new(hourly_response("2024-05-01")));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key).unwrap().date, "2024-05-01");

        cache.insert(key.clone(), Arc::new(hourly_response("2024-05-02")));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key).unwrap().date, "2024-05-02");

        cache.clear();
        assert!(cache.is_empty());
    }
}
