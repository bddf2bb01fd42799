//! Per-category search plans and their execution over a polygon's tiles.

use geo::{Intersects, Polygon};
use hashbrown::HashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::provider::{PlaceQuery, PlacesPage, PlacesProvider};
use crate::config::{PlacesConfig, TilingConfig};
use crate::error::Result;
use crate::models::{Category, Place};
use crate::pip::{SearchTile, TileKey};

/// Provider types and keywords searched for a category
#[derive(Debug, Clone, Copy)]
pub struct SearchPlan {
    pub types: &'static [&'static str],
    pub keywords: &'static [&'static str],
}

impl SearchPlan {
    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Eatery => SearchPlan {
                types: &["restaurant", "food", "cafe", "meal_takeaway"],
                keywords: &["juice", "food shop", "food court", "dining"],
            },
            Category::Office => SearchPlan {
                types: &["establishment", "point_of_interest"],
                keywords: &[
                    "corporate office",
                    "company",
                    "technical company",
                    "insurance company",
                    "co-working space",
                    "coworking space",
                    "software company",
                    "co-working",
                    "coworking",
                ],
            },
            Category::Apartment => SearchPlan {
                types: &["lodging"],
                keywords: &[
                    "apartment building",
                    "apartment buildings",
                    "apartment complex",
                    "residency",
                    "residential building",
                    "residential buildings",
                    "apartment",
                    "apartments",
                    "residential",
                    "complex",
                    "residence",
                ],
            },
            Category::Pg => SearchPlan {
                types: &["lodging"],
                keywords: &[
                    "PG",
                    "PGs",
                    "pg",
                    "pgs",
                    "hostel",
                    "hostels",
                    "co-living",
                    "coliving",
                    "paying guest",
                    "service apartment",
                    "service apartments",
                ],
            },
            Category::Gym => SearchPlan {
                types: &["gym"],
                keywords: &[
                    "gym",
                    "fitness centre",
                    "fitness center",
                    "fitness centres",
                    "fitness centers",
                    "sports complex",
                    "fitness",
                    "workout",
                ],
            },
            Category::Salon => SearchPlan {
                types: &["beauty_salon", "hair_care"],
                keywords: &[
                    "salon",
                    "beauty salon",
                    "hair salon",
                    "barber",
                    "barber shop",
                    "haircut",
                    "spa",
                    "beauty parlor",
                    "beauty parlour",
                    "hair care",
                    "haircutting",
                    "hair styling",
                    "unisex salon",
                ],
            },
        }
    }

    /// Queries to issue per tile: one per type, one per keyword, and
    /// optionally a text search per keyword
    pub fn queries(&self, text_search: bool) -> Vec<PlaceQuery> {
        let mut queries: Vec<PlaceQuery> = self.types.iter().map(|&t| PlaceQuery::Type(t)).collect();
        queries.extend(self.keywords.iter().map(|&k| PlaceQuery::Keyword(k)));
        if text_search {
            queries.extend(self.keywords.iter().map(|&k| PlaceQuery::Text(k)));
        }
        queries
    }
}

/// Request accounting for one polygon analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Provider requests issued (retries included)
    pub requests: usize,
    /// Queries abandoned after exhausting retries
    pub failed_queries: usize,
    /// Tiles split because a query saturated the result cap
    pub subdivisions: usize,
    /// Queries answered from the session cache
    pub cache_hits: usize,
}

/// Executes queries against a provider for a single polygon.
///
/// Responses are cached per (tile, query) so categories sharing a query
/// only hit the provider once.
pub struct SearchSession<'a, P: PlacesProvider> {
    provider: &'a P,
    polygon: &'a Polygon<f64>,
    places: &'a PlacesConfig,
    tiling: &'a TilingConfig,
    cache: HashMap<(TileKey, PlaceQuery), Arc<Vec<Place>>>,
    stats: SearchStats,
}

impl<'a, P: PlacesProvider> SearchSession<'a, P> {
    pub fn new(
        provider: &'a P,
        polygon: &'a Polygon<f64>,
        places: &'a PlacesConfig,
        tiling: &'a TilingConfig,
    ) -> Self {
        Self {
            provider,
            polygon,
            places,
            tiling,
            cache: HashMap::new(),
            stats: SearchStats::default(),
        }
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Run a query over a tile, splitting the tile while bounded queries
    /// come back saturated.
    pub async fn run(&mut self, tile: &SearchTile, query: &PlaceQuery) -> Vec<Place> {
        let mut pending = vec![*tile];
        let mut places = Vec::new();

        while let Some(current) = pending.pop() {
            let found = self.fetch_cached(&current, query).await;

            if query.is_bounded()
                && found.len() >= self.tiling.saturation
                && current.can_subdivide(self.tiling.min_tile_radius_m)
            {
                debug!(
                    "Tile ({:.5}, {:.5}) r={}m saturated for {}, subdividing",
                    current.center.lat, current.center.lng, current.radius_m, query
                );
                self.stats.subdivisions += 1;
                pending.extend(
                    current
                        .subdivide()
                        .into_iter()
                        .filter(|child| self.polygon.intersects(&child.cell)),
                );
            }

            places.extend(found.iter().cloned());
        }

        places
    }

    async fn fetch_cached(&mut self, tile: &SearchTile, query: &PlaceQuery) -> Arc<Vec<Place>> {
        let key = (tile.key(), query.clone());
        if let Some(hit) = self.cache.get(&key) {
            self.stats.cache_hits += 1;
            return Arc::clone(hit);
        }

        let places = Arc::new(self.fetch_all_pages(tile, query).await);
        self.cache.insert(key, Arc::clone(&places));
        places
    }

    /// Follow result pages up to the configured limit
    async fn fetch_all_pages(&mut self, tile: &SearchTile, query: &PlaceQuery) -> Vec<Place> {
        let mut places = Vec::new();
        let mut token: Option<String> = None;

        for page_no in 0..self.places.max_pages.max(1) {
            if page_no > 0 {
                // the provider rejects a page token until it has propagated
                tokio::time::sleep(Duration::from_millis(self.places.page_delay_ms)).await;
            }

            match self.fetch_page_with_retry(tile, query, token.as_deref()).await {
                Ok(page) => {
                    places.extend(page.results);
                    token = page.next_page_token;
                }
                Err(e) => {
                    warn!(
                        "Skipping {} at ({:.5}, {:.5}) page {}: {}",
                        query, tile.center.lat, tile.center.lng, page_no, e
                    );
                    self.stats.failed_queries += 1;
                    break;
                }
            }

            if token.is_none() {
                break;
            }
        }

        places
    }

    async fn fetch_page_with_retry(
        &mut self,
        tile: &SearchTile,
        query: &PlaceQuery,
        token: Option<&str>,
    ) -> Result<PlacesPage> {
        let max_attempts = self.places.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            self.stats.requests += 1;

            match self.provider.search_page(tile, query, token).await {
                Ok(page) => return Ok(page),
                Err(e) if attempts < max_attempts => {
                    warn!(
                        "Places request failed (attempt {}/{}): {}",
                        attempts, max_attempts, e
                    );
                    tokio::time::sleep(Duration::from_millis(self.places.retry_delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::LatLng;
    use crate::pip::haversine_distance;
    use geo::{coord, LineString, Rect};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves pages of 2 results for any query, failing the first `fail_first` calls
    struct PagedProvider {
        pages: usize,
        fail_first: usize,
        calls: AtomicUsize,
    }

    impl PlacesProvider for PagedProvider {
        async fn search_page(
            &self,
            _tile: &SearchTile,
            _query: &PlaceQuery,
            page_token: Option<&str>,
        ) -> Result<PlacesPage> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(Error::provider("places", "UNKNOWN_ERROR", "flaky"));
            }
            let page: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
            let results = (0..2)
                .map(|i| Place::new(&format!("p{}-{}", page, i), "X", &[], LatLng::new(0.0, 0.0)))
                .collect();
            let next = if page + 1 < self.pages { Some((page + 1).to_string()) } else { None };
            Ok(PlacesPage {
                results,
                next_page_token: next,
            })
        }
    }

    /// Returns every stored place inside the tile's circle, capped like the real provider
    struct DenseProvider {
        places: Vec<Place>,
        cap: usize,
    }

    impl PlacesProvider for DenseProvider {
        async fn search_page(
            &self,
            tile: &SearchTile,
            _query: &PlaceQuery,
            _page_token: Option<&str>,
        ) -> Result<PlacesPage> {
            let results = self
                .places
                .iter()
                .filter(|p| haversine_distance(tile.center, p.location().unwrap()) <= tile.radius_m as f64)
                .take(self.cap)
                .cloned()
                .collect();
            Ok(PlacesPage {
                results,
                next_page_token: None,
            })
        }
    }

    fn fast_config() -> PlacesConfig {
        PlacesConfig {
            page_delay_ms: 0,
            retry_delay_ms: 0,
            ..PlacesConfig::default()
        }
    }

    fn square() -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(77.0, 12.0), (77.02, 12.0), (77.02, 12.02), (77.0, 12.02)]),
            vec![],
        )
    }

    fn tile() -> SearchTile {
        SearchTile::from_cell(Rect::new(coord! { x: 77.0, y: 12.0 }, coord! { x: 77.02, y: 12.02 }))
    }

    #[test]
    fn test_plan_queries() {
        let plan = SearchPlan::for_category(Category::Eatery);
        let queries = plan.queries(false);
        assert_eq!(queries.len(), 8);
        assert_eq!(queries[0], PlaceQuery::Type("restaurant"));
        assert_eq!(queries[4], PlaceQuery::Keyword("juice"));
        assert_eq!(plan.queries(true).len(), 12);
    }

    #[tokio::test]
    async fn test_follows_pages_up_to_limit() {
        let provider = PagedProvider {
            pages: 5,
            fail_first: 0,
            calls: AtomicUsize::new(0),
        };
        let poly = square();
        let places = fast_config();
        let tiling = TilingConfig::default();
        let mut session = SearchSession::new(&provider, &poly, &places, &tiling);

        let found = session.run(&tile(), &PlaceQuery::Type("gym")).await;
        assert_eq!(found.len(), 6);
        assert_eq!(session.stats().requests, 3);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let provider = PagedProvider {
            pages: 1,
            fail_first: 1,
            calls: AtomicUsize::new(0),
        };
        let poly = square();
        let places = fast_config();
        let tiling = TilingConfig::default();
        let mut session = SearchSession::new(&provider, &poly, &places, &tiling);

        let found = session.run(&tile(), &PlaceQuery::Keyword("gym")).await;
        assert_eq!(found.len(), 2);
        assert_eq!(session.stats().requests, 2);
        assert_eq!(session.stats().failed_queries, 0);
    }

    #[tokio::test]
    async fn test_exhausted_retries_skip_query() {
        let provider = PagedProvider {
            pages: 1,
            fail_first: 10,
            calls: AtomicUsize::new(0),
        };
        let poly = square();
        let places = fast_config();
        let tiling = TilingConfig::default();
        let mut session = SearchSession::new(&provider, &poly, &places, &tiling);

        let found = session.run(&tile(), &PlaceQuery::Keyword("gym")).await;
        assert!(found.is_empty());
        assert_eq!(session.stats().failed_queries, 1);
        assert_eq!(session.stats().requests, 2);
    }

    #[tokio::test]
    async fn test_cache_shares_identical_queries() {
        let provider = PagedProvider {
            pages: 1,
            fail_first: 0,
            calls: AtomicUsize::new(0),
        };
        let poly = square();
        let places = fast_config();
        let tiling = TilingConfig::default();
        let mut session = SearchSession::new(&provider, &poly, &places, &tiling);

        session.run(&tile(), &PlaceQuery::Type("lodging")).await;
        session.run(&tile(), &PlaceQuery::Type("lodging")).await;
        session.run(&tile(), &PlaceQuery::Keyword("lodging")).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_saturated_tile_is_subdivided() {
        // 400 places on a 20x20 lattice across the square, provider cap of 60
        let mut stored = Vec::new();
        for i in 0..20 {
            for j in 0..20 {
                let loc = LatLng::new(12.0005 + 0.001 * j as f64, 77.0005 + 0.001 * i as f64);
                stored.push(Place::new(&format!("{}-{}", i, j), "P", &[], loc));
            }
        }
        let provider = DenseProvider { places: stored, cap: 60 };
        let poly = square();
        let places = fast_config();
        let tiling = TilingConfig {
            max_tile_radius_m: 2000.0,
            min_tile_radius_m: 100.0,
            ..TilingConfig::default()
        };
        let mut session = SearchSession::new(&provider, &poly, &places, &tiling);

        let found = session.run(&tile(), &PlaceQuery::Type("store")).await;
        let unique: std::collections::HashSet<_> = found.iter().filter_map(|p| p.place_id.clone()).collect();
        assert!(session.stats().subdivisions > 0);
        assert_eq!(unique.len(), 400);
    }

    #[tokio::test]
    async fn test_text_queries_are_not_subdivided() {
        let provider = PagedProvider {
            pages: 30,
            fail_first: 0,
            calls: AtomicUsize::new(0),
        };
        let poly = square();
        let places = PlacesConfig {
            max_pages: 30,
            ..fast_config()
        };
        let tiling = TilingConfig::default();
        let mut session = SearchSession::new(&provider, &poly, &places, &tiling);

        session.run(&tile(), &PlaceQuery::Text("hostel")).await;
        assert_eq!(session.stats().subdivisions, 0);
    }
}
