//! Spherical helpers and the exact point-in-polygon test.

use geo::{Destination, Distance, Haversine, LineString, Point, Polygon};

use crate::models::LatLng;

fn to_point(p: LatLng) -> Point<f64> {
    Point::new(p.lng, p.lat)
}

/// Great-circle distance between two points in meters.
#[inline]
pub fn haversine_distance(a: LatLng, b: LatLng) -> f64 {
    Haversine.distance(to_point(a), to_point(b))
}

/// Point reached from `origin` after `distance_m` along `bearing_deg`
/// (degrees clockwise from north) on a great circle. Longitude comes back
/// normalized to [-180, 180].
pub fn destination(origin: LatLng, bearing_deg: f64, distance_m: f64) -> LatLng {
    let dest = Haversine.destination(to_point(origin), bearing_deg, distance_m);
    LatLng::new(dest.y(), dest.x())
}

/// Number of distinct vertices in a ring (the closing vertex is not counted)
pub fn ring_vertex_count(ring: &LineString<f64>) -> usize {
    let n = ring.0.len();
    if n > 1 && ring.0.first() == ring.0.last() {
        n - 1
    } else {
        n
    }
}

/// Ray-casting test: is `point` strictly inside `polygon`?
///
/// The ray is cast along increasing latitude; every ring (exterior and
/// holes) toggles the parity, so points in holes are outside. A polygon
/// whose exterior has fewer than 3 vertices contains nothing.
pub fn point_in_polygon(point: LatLng, polygon: &Polygon<f64>) -> bool {
    if ring_vertex_count(polygon.exterior()) < 3 {
        return false;
    }

    let mut inside = false;
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        if ring_crossings_odd(point, ring) {
            inside = !inside;
        }
    }
    inside
}

fn ring_crossings_odd(point: LatLng, ring: &LineString<f64>) -> bool {
    let coords = &ring.0;
    let n = coords.len();
    if n < 2 {
        return false;
    }

    let mut odd = false;
    // walk every edge including the implicit closing one
    let mut prev = coords[n - 1];
    for &cur in coords {
        let (p1_lat, p1_lng) = (prev.y, prev.x);
        let (p2_lat, p2_lng) = (cur.y, cur.x);

        if (p1_lng > point.lng) != (p2_lng > point.lng) {
            let intersect_lat = (point.lng - p1_lng) * (p2_lat - p1_lat) / (p2_lng - p1_lng) + p1_lat;
            if point.lat <= intersect_lat {
                odd = !odd;
            }
        }
        prev = cur;
    }
    odd
}
