//! Great-circle distance

/// Mean Earth radius in metres
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in metres between two points given in degrees.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identical_points() {
        assert_eq!(haversine_m(24.7136, 46.6753, 24.7136, 46.6753), 0.0);
    }

    #[test]
    fn test_known_distance() {
        // Riyadh to Jeddah, roughly 846 km
        let d = haversine_m(24.7136, 46.6753, 21.4858, 39.1925);
        assert!((d - 846_000.0).abs() < 5_000.0, "got {}", d);
    }

    #[test]
    fn test_one_degree_latitude() {
        let d = haversine_m(0.0, 0.0, 1.0, 0.0);
        let expected = EARTH_RADIUS_M * 1.0_f64.to_radians();
        assert!((d - expected).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_symmetric(
            lat1 in -90.0f64..90.0, lon1 in -180.0f64..180.0,
            lat2 in -90.0f64..90.0, lon2 in -180.0f64..180.0,
        ) {
            let ab = haversine_m(lat1, lon1, lat2, lon2);
            let ba = haversine_m(lat2, lon2, lat1, lon1);
            prop_assert!((ab - ba).abs() < 1e-6);
        }

        #[test]
        fn prop_self_distance_is_zero(lat in -90.0f64..90.0, lon in -180.0f64..180.0) {
            prop_assert!(haversine_m(lat, lon, lat, lon).abs() < 1e-9);
        }
    }
}
