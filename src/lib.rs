//! POI density analysis over user-supplied polygons.
//!
//! Polygons are covered with circular search tiles, searched per category
//! through a places provider, filtered with an exact point-in-polygon test,
//! classified and counted. The `isochrone` module builds reachable-area
//! polygons from a routing provider.

pub mod analyzer;
pub mod classify;
pub mod config;
pub mod error;
pub mod isochrone;
pub mod models;
pub mod pip;
pub mod places;
pub mod report;

pub use analyzer::{Analyzer, PolygonReport};
pub use config::Config;
pub use error::{Error, Result};
pub use models::{Category, CategoryCounts, LatLng, Place};
pub use pip::SearchPolygon;
pub use report::Summary;
