//! Location model for geographic coordinates and the server-resolved place

use serde::{Deserialize, Serialize};

/// A coordinate pair, as emitted by the map pin or resolved by the server
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Round coordinates to `precision` decimal places
    #[must_use]
    pub fn rounded(&self, precision: u32) -> Self {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        Self {
            lat: (self.lat * multiplier).round() / multiplier,
            lon: (self.lon * multiplier).round() / multiplier,
        }
    }

    /// Format as a `lat, lon` string with 4 decimals
    #[must_use]
    pub fn format(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// Location block of an analyze result
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Resolved place name
    #[serde(default)]
    pub city: String,
    /// Country name or code
    #[serde(default)]
    pub country: String,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
}

impl Location {
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }

    /// Display label, e.g. `Cusco, PE`, or the coordinates when unnamed
    #[must_use]
    pub fn label(&self) -> String {
        match (self.city.trim(), self.country.trim()) {
            ("", _) => self.coordinates().format(),
            (city, "") => city.to_string(),
            (city, country) => format!("{city}, {country}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounded_coordinates() {
        let coords = Coordinates::new(46.818_234, 8.227_456);
        let rounded = coords.rounded(2);
        assert_eq!(rounded.lat, 46.82);
        assert_eq!(rounded.lon, 8.23);
    }

    #[test]
    fn test_location_label() {
        let mut location = Location {
            city: "Cusco".to_string(),
            country: "PE".to_string(),
            lat: -13.5319,
            lon: -71.9675,
        };
        assert_eq!(location.label(), "Cusco, PE");

        location.country.clear();
        assert_eq!(location.label(), "Cusco");

        location.city.clear();
        assert_eq!(location.label(), "-13.5319, -71.9675");
    }
}
