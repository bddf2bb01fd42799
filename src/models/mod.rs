//! Core data models for the density analyzer.

pub mod category;
pub mod place;

pub use category::{Category, CategoryCounts};
pub use place::{LatLng, Place, PlaceGeometry};
