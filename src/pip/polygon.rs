//! Named analysis polygon.

use geo::{Coord, LineString, Polygon};

use super::geometry::{point_in_polygon, ring_vertex_count};
use super::wkt::{parse_wkt_polygon, polygon_to_wkt};
use crate::error::Result;
use crate::models::LatLng;

/// A user-supplied polygon to analyze, with its display name.
#[derive(Debug, Clone)]
pub struct SearchPolygon {
    pub name: String,
    pub geometry: Polygon<f64>,
}

impl SearchPolygon {
    pub fn new(name: impl Into<String>, vertices: &[LatLng]) -> Self {
        let coords: Vec<Coord<f64>> = vertices.iter().map(|v| Coord::from(*v)).collect();
        Self {
            name: name.into(),
            geometry: Polygon::new(LineString::new(coords), vec![]),
        }
    }

    /// Parse from WKT text; never fails, but the result may have fewer than 3 vertices
    pub fn from_wkt(name: impl Into<String>, wkt: &str) -> Self {
        Self::new(name, &parse_wkt_polygon(wkt))
    }

    /// Distinct vertices of the exterior ring, lat/lng
    pub fn vertices(&self) -> Vec<LatLng> {
        let ring = self.geometry.exterior();
        ring.0
            .iter()
            .take(ring_vertex_count(ring))
            .map(|c| LatLng::from(*c))
            .collect()
    }

    /// A polygon needs at least 3 vertices to enclose anything
    pub fn is_valid(&self) -> bool {
        ring_vertex_count(self.geometry.exterior()) >= 3
    }

    pub fn contains(&self, point: LatLng) -> bool {
        point_in_polygon(point, &self.geometry)
    }

    pub fn to_wkt(&self) -> Result<String> {
        polygon_to_wkt(&self.vertices())
    }
}
