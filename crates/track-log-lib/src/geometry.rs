//! Geometry over decoded points
//!
//! Distances are great-circle (haversine) distances in meters. Simplification projects
//! to Web Mercator first so tolerances are expressed in square meters.

use geo::{Coord, LineString, Point, SimplifyVwIdx};

use crate::model::{Bounds, Waypoint};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6371000.0;

/// Web Mercator bounds in meters (EPSG:3857)
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Precomputed constant: EARTH_MERCATOR_MAX / 180.0
const LON_TO_X_FACTOR: f64 = EARTH_MERCATOR_MAX / 180.0;

/// Precomputed constant: EARTH_MERCATOR_MAX / PI
const Y_FACTOR: f64 = EARTH_MERCATOR_MAX / std::f64::consts::PI;

/// Convert WGS84 (lat, lon) to Web Mercator (x, y) in meters
///
/// Latitude is clamped to the representable range.
#[inline(always)]
pub fn wgs84_to_mercator(lat: f64, lon: f64) -> Point<f64> {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = lon * LON_TO_X_FACTOR;
    let lat_rad = lat.to_radians();
    let y = (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() * Y_FACTOR;
    Point::new(x, y)
}

#[inline(always)]
pub fn waypoint_to_mercator(point: &Waypoint) -> Point<f64> {
    wgs84_to_mercator(point.latitude, point.longitude)
}

/// Haversine distance between two points in meters, ignoring elevation
#[inline]
pub fn haversine_distance(p1: &Waypoint, p2: &Waypoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let delta_lat = (p2.latitude - p1.latitude).to_radians();
    let delta_lon = (p2.longitude - p1.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[inline]
pub fn distance_2d(p1: &Waypoint, p2: &Waypoint) -> f64 {
    haversine_distance(p1, p2)
}

/// Distance including the elevation difference, when both points have one
pub fn distance_3d(p1: &Waypoint, p2: &Waypoint) -> f64 {
    let flat = haversine_distance(p1, p2);
    match (p1.elevation, p2.elevation) {
        (Some(e1), Some(e2)) => flat.hypot(e2 - e1),
        _ => flat,
    }
}

/// Slope from `p1` to `p2` in degrees
///
/// `None` without both elevations or when the points coincide horizontally.
pub fn elevation_angle(p1: &Waypoint, p2: &Waypoint) -> Option<f64> {
    let (e1, e2) = (p1.elevation?, p2.elevation?);
    let flat = haversine_distance(p1, p2);
    if flat == 0.0 {
        return None;
    }
    Some((e2 - e1).atan2(flat).to_degrees())
}

/// Length of a polyline in meters
pub fn length_2d(points: &[Waypoint]) -> f64 {
    points.windows(2).map(|w| distance_2d(&w[0], &w[1])).sum()
}

pub fn length_3d(points: &[Waypoint]) -> f64 {
    points.windows(2).map(|w| distance_3d(&w[0], &w[1])).sum()
}

/// Smallest box containing all points
pub fn bounds<'a>(points: impl IntoIterator<Item = &'a Waypoint>) -> Option<Bounds> {
    let mut points = points.into_iter();
    let first = points.next()?;
    let (mut min_lat, mut max_lat) = (first.latitude, first.latitude);
    let (mut min_lon, mut max_lon) = (first.longitude, first.longitude);
    for point in points {
        min_lat = min_lat.min(point.latitude);
        max_lat = max_lat.max(point.latitude);
        min_lon = min_lon.min(point.longitude);
        max_lon = max_lon.max(point.longitude);
    }
    Some(Bounds {
        min_latitude: Some(min_lat),
        max_latitude: Some(max_lat),
        min_longitude: Some(min_lon),
        max_longitude: Some(max_lon),
    })
}

/// Indices of the points kept by Visvalingam-Whyatt simplification
///
/// `tolerance` is the minimum triangle area in square meters. The first and last points
/// are always kept.
pub fn simplify_indices(points: &[Waypoint], tolerance: f64) -> Vec<usize> {
    #[cfg(feature = "profiling")]
    profiling::scope!("geometry::simplify_indices");

    if points.len() <= 2 {
        return (0..points.len()).collect();
    }

    let coords: Vec<Coord<f64>> = points
        .iter()
        .map(|p| waypoint_to_mercator(p).into())
        .collect();
    LineString::from(coords).simplify_vw_idx(tolerance)
}

/// Index of and distance to the point closest to `target`
pub fn nearest_point(points: &[Waypoint], target: &Waypoint) -> Option<(usize, f64)> {
    points
        .iter()
        .map(|point| haversine_distance(point, target))
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(lat: f64, lon: f64, ele: Option<f64>) -> Waypoint {
        Waypoint {
            elevation: ele,
            ..Waypoint::new(lat, lon)
        }
    }

    #[test]
    fn test_wgs84_to_mercator_origin() {
        let point = wgs84_to_mercator(0.0, 0.0);
        assert!(point.x().abs() < 0.01);
        assert!(point.y().abs() < 0.01);
    }

    #[test]
    fn test_wgs84_to_mercator_clamps_poles() {
        let pole = wgs84_to_mercator(90.0, 180.0);
        assert!((pole.x() - EARTH_MERCATOR_MAX).abs() < 1.0);
        assert!(pole.y().is_finite());
    }

    #[test]
    fn test_haversine_one_degree_at_equator() {
        let d = haversine_distance(&at(0.0, 0.0, None), &at(0.0, 1.0, None));
        assert!((d - 111_195.0).abs() < 10.0, "{d}");
    }

    #[test]
    fn test_distance_3d_uses_elevation() {
        let a = at(0.0, 0.0, Some(0.0));
        let b = at(0.0, 0.0, Some(30.0));
        assert_eq!(distance_2d(&a, &b), 0.0);
        assert!((distance_3d(&a, &b) - 30.0).abs() < 1e-9);
        assert_eq!(distance_3d(&a, &at(0.0, 0.0, None)), 0.0);
    }

    #[test]
    fn test_elevation_angle() {
        let a = at(0.0, 0.0, Some(0.0));
        let b = at(0.0, 0.001, Some(0.0));
        assert_eq!(elevation_angle(&a, &b), Some(0.0));

        let flat = haversine_distance(&a, &b);
        let up = at(0.0, 0.001, Some(flat));
        assert!((elevation_angle(&a, &up).unwrap() - 45.0).abs() < 1e-6);

        assert_eq!(elevation_angle(&a, &a), None);
        assert_eq!(elevation_angle(&a, &at(0.0, 0.001, None)), None);
    }

    #[test]
    fn test_lengths() {
        let points = [at(0.0, 0.0, Some(0.0)), at(0.0, 1.0, Some(0.0)), at(0.0, 2.0, Some(100.0))];
        let flat = length_2d(&points);
        assert!((flat - 2.0 * 111_195.0).abs() < 20.0);
        assert!(length_3d(&points) > flat);
        assert_eq!(length_2d(&points[..1]), 0.0);
        assert_eq!(length_2d(&[]), 0.0);
    }

    #[test]
    fn test_bounds() {
        let points = [at(1.0, 5.0, None), at(-2.0, 7.0, None), at(0.5, -1.0, None)];
        let bounds = bounds(&points).unwrap();
        assert_eq!(bounds.min_latitude, Some(-2.0));
        assert_eq!(bounds.max_latitude, Some(1.0));
        assert_eq!(bounds.min_longitude, Some(-1.0));
        assert_eq!(bounds.max_longitude, Some(7.0));
        assert!(super::bounds(&[]).is_none());
    }

    #[test]
    fn test_simplify_keeps_endpoints_and_drops_collinear() {
        let points: Vec<_> = (0..10).map(|i| at(0.0, i as f64 * 0.001, None)).collect();
        assert_eq!(simplify_indices(&points, 1.0), vec![0, 9]);

        let mut zigzag = points.clone();
        zigzag[5].latitude = 0.01;
        let kept = simplify_indices(&zigzag, 1.0);
        assert!(kept.contains(&5));
        assert_eq!(kept.first(), Some(&0));
        assert_eq!(kept.last(), Some(&9));
    }

    #[test]
    fn test_simplify_short_inputs() {
        assert!(simplify_indices(&[], 1.0).is_empty());
        assert_eq!(simplify_indices(&[at(0.0, 0.0, None)], 1.0), vec![0]);
    }

    #[test]
    fn test_nearest_point() {
        let points = [at(0.0, 0.0, None), at(0.0, 1.0, None), at(0.0, 2.0, None)];
        let (index, distance) = nearest_point(&points, &at(0.1, 1.1, None)).unwrap();
        assert_eq!(index, 1);
        assert!(distance > 0.0);
        assert!(nearest_point(&[], &points[0]).is_none());
    }
}
