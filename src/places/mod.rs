//! Places search: provider client, per-category plans and tiled execution.

mod client;
mod provider;
mod search;

pub(crate) use client::truncate;
pub use client::GooglePlacesClient;
pub use provider::{PlaceQuery, PlacesPage, PlacesProvider};
pub use search::{SearchPlan, SearchSession, SearchStats};
