//! A single GPS sample.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::Error;
use crate::haversine::haversine;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub ride_id: i64,
    pub lat: f64,
    pub lon: f64,
    /// Second precision, UTC.
    pub timestamp: DateTime<Utc>,
}

impl Position {
    /// Parse one raw `(ride_id, latitude, longitude, unix_seconds)` tuple.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] naming the first field that is not a valid
    /// number or falls outside its coordinate range.
    pub fn parse(ride_id: &str, lat: &str, lon: &str, timestamp: &str) -> Result<Self, Error> {
        let ride_id = ride_id
            .parse::<i64>()
            .map_err(|_| malformed("ride_id", ride_id))?;
        let lat = lat
            .parse::<f64>()
            .ok()
            .filter(|v| (-90.0..=90.0).contains(v))
            .ok_or_else(|| malformed("latitude", lat))?;
        let lon = lon
            .parse::<f64>()
            .ok()
            .filter(|v| (-180.0..=180.0).contains(v))
            .ok_or_else(|| malformed("longitude", lon))?;
        let seconds = timestamp
            .parse::<i64>()
            .map_err(|_| malformed("timestamp", timestamp))?;
        let timestamp = Utc
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| malformed("timestamp", timestamp))?;

        Ok(Self {
            ride_id,
            lat,
            lon,
            timestamp,
        })
    }

    /// Great-circle distance to `other`, in km.
    pub fn distance(&self, other: &Position) -> f64 {
        haversine(self.lon, self.lat, other.lon, other.lat)
    }
}

fn malformed(field: &'static str, value: &str) -> Error {
    Error::Parse {
        field,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(ride_id: i64, lat: f64, lon: f64, seconds: i64) -> Position {
        Position {
            ride_id,
            lat,
            lon,
            timestamp: Utc.timestamp_opt(seconds, 0).unwrap(),
        }
    }

    #[test]
    fn parses_a_valid_tuple() {
        let p = Position::parse("1", "37.942437", "23.642862", "1405595819").unwrap();
        assert_eq!(p.ride_id, 1);
        assert_eq!(p.lat, 37.942437);
        assert_eq!(p.lon, 23.642862);
        assert_eq!(p.timestamp.timestamp(), 1405595819);
    }

    #[test]
    fn rejects_malformed_fields() {
        let cases = [
            ["a", "37.942437", "23.642862", "1405595819"],
            ["1", "a", "23.642862", "1405595819"],
            ["1", "37.942437", "a", "1405595819"],
            ["1", "37.942437", "23.642862", "a"],
        ];
        for [ride_id, lat, lon, ts] in cases {
            assert!(Position::parse(ride_id, lat, lon, ts).is_err());
        }
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(matches!(
            Position::parse("1", "91.0", "23.6", "1405595819"),
            Err(Error::Parse {
                field: "latitude",
                ..
            })
        ));
        assert!(matches!(
            Position::parse("1", "37.9", "-180.5", "1405595819"),
            Err(Error::Parse {
                field: "longitude",
                ..
            })
        ));
    }

    #[test]
    fn distance_between_two_samples() {
        let p1 = position(1, 37.966660, 23.728308, 1405594957);
        let p2 = position(1, 37.966627, 23.728263, 1405594966);
        assert!((p1.distance(&p2) - 0.005387608950290441).abs() < 1e-12);
    }
}
