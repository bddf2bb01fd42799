//! Places provider abstraction.

use std::fmt;
use std::future::Future;

use crate::error::Result;
use crate::models::Place;
use crate::pip::SearchTile;

/// A single provider query, independent of where it is issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlaceQuery {
    /// Radius-bounded search filtered by provider place type
    Type(&'static str),
    /// Radius-bounded search filtered by free-text keyword
    Keyword(&'static str),
    /// Text search biased (not bounded) to the tile
    Text(&'static str),
}

impl PlaceQuery {
    /// Whether the provider strictly bounds results to the tile's circle
    pub fn is_bounded(&self) -> bool {
        !matches!(self, PlaceQuery::Text(_))
    }
}

impl fmt::Display for PlaceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceQuery::Type(t) => write!(f, "type={}", t),
            PlaceQuery::Keyword(k) => write!(f, "keyword={}", k),
            PlaceQuery::Text(q) => write!(f, "text={}", q),
        }
    }
}

/// One page of provider results
#[derive(Debug, Clone, Default)]
pub struct PlacesPage {
    pub results: Vec<Place>,
    pub next_page_token: Option<String>,
}

/// Source of place records for a tile and query.
///
/// Implementations fetch one page at a time; pagination, retries and
/// caching are handled by [`super::SearchSession`].
pub trait PlacesProvider: Send + Sync {
    fn search_page(
        &self,
        tile: &SearchTile,
        query: &PlaceQuery,
        page_token: Option<&str>,
    ) -> impl Future<Output = Result<PlacesPage>> + Send;
}
