use geo::{Distance, Geodesic, Point};

/// Geodesic distance in meters between two (lat, lon) points on the WGS84
/// ellipsoid (Karney's algorithm via the `geo` crate).
#[inline]
pub fn geodesic_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    // geo points are (x = lon, y = lat)
    let p1 = Point::new(a.1, a.0);
    let p2 = Point::new(b.1, b.0);
    Geodesic::distance(p1, p2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geodesic_distance_zero() {
        assert_eq!(geodesic_distance((52.52, 13.405), (52.52, 13.405)), 0.0);
    }

    #[test]
    fn test_geodesic_distance_short() {
        let d = geodesic_distance((52.5200, 13.4050), (52.5201, 13.4051));
        assert!(d > 12.0 && d < 15.0, "expected ~13m, got {}", d);
    }

    #[test]
    fn test_geodesic_distance_symmetric() {
        let a = (52.5200, 13.4050);
        let b = (52.6000, 13.5000);
        let d1 = geodesic_distance(a, b);
        let d2 = geodesic_distance(b, a);
        assert!((d1 - d2).abs() < 1e-6);
        // Roughly 10.8 km across northeast Berlin
        assert!(d1 > 10_000.0 && d1 < 12_000.0, "got {}", d1);
    }
}
