//! Polygon geometry: loading, tiling and point-in-polygon tests.
//!
//! Polygons arrive as WKT, are covered by circular search tiles for the
//! places provider, and every returned place is checked against the
//! input polygon with an exact ray-casting test.

pub mod geometry;
mod polygon;
pub mod tiling;
pub mod wkt;

pub use geometry::{destination, haversine_distance, point_in_polygon};
pub use polygon::SearchPolygon;
pub use tiling::{bounds, tile_polygon, Bounds, SearchTile, TileKey};
pub use wkt::{parse_wkt_polygon, polygon_to_wkt};
