//! Great-circle distance.

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance in kilometres between two points on the Earth's surface,
/// as the crow flies. Arguments are in degrees, longitude first.
pub fn haversine(lon_from: f64, lat_from: f64, lon_to: f64, lat_to: f64) -> f64 {
    let delta_lat = (lat_to - lat_from).to_radians();
    let delta_lon = (lon_to - lon_from).to_radians();

    let a = (delta_lat / 2.0).sin() * (delta_lat / 2.0).sin()
        + lat_from.to_radians().cos()
            * lat_to.to_radians().cos()
            * (delta_lon / 2.0).sin()
            * (delta_lon / 2.0).sin();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_distance() {
        let distance = haversine(23.730235, 37.967349, 23.730235, 37.967348);
        assert!((distance - 0.000_111_194_926_363_818_55).abs() < 1e-18);
    }

    #[test]
    fn zero_distance_for_identical_points() {
        assert_eq!(haversine(23.7, 37.9, 23.7, 37.9), 0.0);
    }
}
