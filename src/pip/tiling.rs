//! Covering a polygon with circular search regions.
//!
//! Places providers answer "what is within R meters of P" and stop after a
//! fixed number of results, so a large polygon has to be split into many
//! small circles. The polygon's bounding box is cut into a grid of cells
//! whose circumscribed circle fits under the configured radius; cells that
//! miss the polygon are dropped.
//!
//! Extents are taken from the degree span of the bounding box, the same
//! span the grid is cut over. A ring written across the antimeridian is
//! therefore tiled as the long way round, which is how `geo` reads it.

use geo::{coord, Intersects, Polygon, Rect};
use serde::Serialize;
use tracing::{debug, warn};

use super::geometry::haversine_distance;
use crate::config::TilingConfig;
use crate::error::{Error, Result};
use crate::models::LatLng;

/// Largest radius the places provider accepts for a nearby search
pub const MAX_SEARCH_RADIUS_M: u32 = 50_000;

/// Length of one degree of arc on the equator
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Axis-aligned lat/lng bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub southwest: LatLng,
    pub northeast: LatLng,
}

impl Bounds {
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.southwest.lat + self.northeast.lat) / 2.0,
            (self.southwest.lng + self.northeast.lng) / 2.0,
        )
    }

    /// East-west extent in meters along the center latitude, following the
    /// full longitude span from the west edge to the east edge
    pub fn width_m(&self) -> f64 {
        let span = (self.northeast.lng - self.southwest.lng).abs();
        span * self.center().lat.to_radians().cos() * METERS_PER_DEGREE
    }

    fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.southwest.lng, y: self.southwest.lat },
            coord! { x: self.northeast.lng, y: self.northeast.lat },
        )
    }

    /// North-south extent in meters
    pub fn height_m(&self) -> f64 {
        let lng = self.center().lng;
        haversine_distance(
            LatLng::new(self.southwest.lat, lng),
            LatLng::new(self.northeast.lat, lng),
        )
    }
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Self {
            southwest: LatLng::new(rect.min().y, rect.min().x),
            northeast: LatLng::new(rect.max().y, rect.max().x),
        }
    }
}

/// One circular search region covering a rectangular cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchTile {
    #[serde(skip)]
    pub cell: Rect<f64>,
    pub center: LatLng,
    pub radius_m: u32,
}

/// Hashable identity of a tile, used to cache provider responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    lat_e7: i64,
    lng_e7: i64,
    radius_m: u32,
}

impl SearchTile {
    /// Build the circumscribed search circle of a cell
    pub fn from_cell(cell: Rect<f64>) -> Self {
        let c = cell.center();
        let center = LatLng::new(c.y, c.x);
        let (min, max) = (cell.min(), cell.max());
        // corners nearer the equator are farther apart in longitude
        let radius = [(min.y, min.x), (min.y, max.x), (max.y, min.x), (max.y, max.x)]
            .into_iter()
            .map(|(lat, lng)| haversine_distance(center, LatLng::new(lat, lng)))
            .fold(0.0_f64, f64::max)
            .ceil()
            .max(1.0);
        if radius > MAX_SEARCH_RADIUS_M as f64 {
            warn!(
                "Cell around ({:.5}, {:.5}) needs a {:.0}m radius, capped at {}m; its corners are not searched",
                center.lat, center.lng, radius, MAX_SEARCH_RADIUS_M
            );
        }
        Self {
            cell,
            center,
            radius_m: (radius as u32).min(MAX_SEARCH_RADIUS_M),
        }
    }

    /// Search circle of a fixed radius around a cell's center
    pub fn with_radius(cell: Rect<f64>, radius_m: u32) -> Self {
        let c = cell.center();
        Self {
            cell,
            center: LatLng::new(c.y, c.x),
            radius_m: radius_m.clamp(1, MAX_SEARCH_RADIUS_M),
        }
    }

    /// Split into the four quadrant cells, south-west first
    pub fn subdivide(&self) -> [SearchTile; 4] {
        let min = self.cell.min();
        let max = self.cell.max();
        let mid = self.cell.center();
        [
            SearchTile::from_cell(Rect::new(min, mid)),
            SearchTile::from_cell(Rect::new(coord! { x: mid.x, y: min.y }, coord! { x: max.x, y: mid.y })),
            SearchTile::from_cell(Rect::new(coord! { x: min.x, y: mid.y }, coord! { x: mid.x, y: max.y })),
            SearchTile::from_cell(Rect::new(mid, max)),
        ]
    }

    /// Whether halving this tile keeps it at or above `min_radius_m`
    pub fn can_subdivide(&self, min_radius_m: f64) -> bool {
        self.radius_m as f64 / 2.0 >= min_radius_m
    }

    pub fn key(&self) -> TileKey {
        TileKey {
            lat_e7: (self.center.lat * 1e7).round() as i64,
            lng_e7: (self.center.lng * 1e7).round() as i64,
            radius_m: self.radius_m,
        }
    }
}

/// Bounding box of a polygon, `None` for an empty ring
pub fn bounds(polygon: &Polygon<f64>) -> Option<Bounds> {
    use geo::BoundingRect;
    polygon.bounding_rect().map(Bounds::from)
}

/// Largest tile radius whose square cell still fits under the provider cap
pub fn max_cell_radius_m() -> f64 {
    MAX_SEARCH_RADIUS_M as f64 / std::f64::consts::SQRT_2
}

/// Cover `polygon` with search tiles no larger than `config.max_tile_radius_m`.
///
/// Fails with [`Error::TooManyTiles`] once more than `config.max_tiles`
/// tiles would be needed.
pub fn tile_polygon(polygon: &Polygon<f64>, config: &TilingConfig) -> Result<Vec<SearchTile>> {
    let Some(bounds) = bounds(polygon) else {
        return Ok(Vec::new());
    };
    let rect = bounds.to_rect();
    let width_m = bounds.width_m();
    let height_m = bounds.height_m();

    if width_m < 1.0 && height_m < 1.0 {
        return Ok(vec![SearchTile::with_radius(rect, config.min_tile_radius_m.ceil() as u32)]);
    }

    let mut max_radius_m = config.max_tile_radius_m;
    if max_radius_m > max_cell_radius_m() {
        warn!(
            "max_tile_radius_m {:.0} exceeds the {:.0}m a {}m search circle can cover, using the latter",
            max_radius_m,
            max_cell_radius_m(),
            MAX_SEARCH_RADIUS_M
        );
        max_radius_m = max_cell_radius_m();
    }

    // a square cell of side r*sqrt(2) has a circumscribed radius of r
    let side_m = (max_radius_m * std::f64::consts::SQRT_2).max(1.0);
    let cols = (width_m / side_m).ceil().max(1.0) as usize;
    let rows = (height_m / side_m).ceil().max(1.0) as usize;

    let d_lng = rect.width() / cols as f64;
    let d_lat = rect.height() / rows as f64;
    let origin = rect.min();

    let mut tiles = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let min_x = origin.x + col as f64 * d_lng;
            let min_y = origin.y + row as f64 * d_lat;
            let cell = Rect::new(
                coord! { x: min_x, y: min_y },
                coord! { x: min_x + d_lng, y: min_y + d_lat },
            );
            if polygon.intersects(&cell) {
                if tiles.len() == config.max_tiles {
                    return Err(Error::TooManyTiles { limit: config.max_tiles });
                }
                tiles.push(SearchTile::from_cell(cell));
            }
        }
    }

    debug!(
        "Tiled {:.0}m x {:.0}m bounds into {} of {} cells",
        width_m,
        height_m,
        tiles.len(),
        rows * cols
    );

    Ok(tiles)
}
