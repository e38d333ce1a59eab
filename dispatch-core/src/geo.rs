//! C1: great-circle distance and coordinate validation.

/// WGS84 mean earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A validated, present `(lat, lon)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Returns `None` if either value is out of the valid WGS84 range.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        (( -90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some(Self { lat, lon })
    }

    pub fn try_from_options(lat: Option<f64>, lon: Option<f64>) -> Option<Self> {
        Self::new(lat?, lon?)
    }
}

/// Distance between two points in kilometers, or `None` when either
/// coordinate is missing or invalid. Callers must not treat a missing
/// distance as zero (§4.1: "a sentinel, not zero").
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Distance between two optionally-present coordinate pairs. `None` (the
/// "unknown" sentinel from §4.1) propagates whenever either side is
/// missing or invalid.
pub fn distance_km(a_lat: Option<f64>, a_lon: Option<f64>, b_lat: Option<f64>, b_lon: Option<f64>) -> Option<f64> {
    let a = Coordinate::try_from_options(a_lat, a_lon)?;
    let b = Coordinate::try_from_options(b_lat, b_lon)?;
    Some(haversine_km(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_same_point() {
        let p = Coordinate::new(40.0, -74.0).unwrap();
        assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn matches_known_short_distance() {
        // S1 from spec.md: (40.00, -74.00) to (40.01, -74.01) is ~1.4 km.
        let a = Coordinate::new(40.00, -74.00).unwrap();
        let b = Coordinate::new(40.01, -74.01).unwrap();
        let d = haversine_km(a, b);
        assert!((1.0..2.0).contains(&d), "expected ~1.4km, got {d}");
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(Coordinate::new(95.0, 0.0).is_none());
        assert!(Coordinate::new(0.0, 200.0).is_none());
    }

    #[test]
    fn missing_coordinate_yields_none() {
        assert_eq!(distance_km(Some(40.0), None, Some(41.0), Some(-74.0)), None);
        assert_eq!(distance_km(None, None, None, None), None);
    }

    #[test]
    fn antipodal_points_are_half_circumference() {
        let a = Coordinate::new(0.0, 0.0).unwrap();
        let b = Coordinate::new(0.0, 180.0).unwrap();
        let d = haversine_km(a, b);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }
}
