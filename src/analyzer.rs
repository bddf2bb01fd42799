//! Polygon density analysis: tile, search, filter, classify, tally.

use hashbrown::HashSet;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::classify;
use crate::config::{PlacesConfig, TilingConfig};
use crate::models::{Category, CategoryCounts};
use crate::pip::{tile_polygon, SearchPolygon};
use crate::places::{PlacesProvider, SearchPlan, SearchSession, SearchStats};

/// Category counts for one polygon plus request accounting
#[derive(Debug, Clone, Serialize)]
pub struct PolygonReport {
    pub name: String,
    pub counts: CategoryCounts,
    pub tiles: usize,
    pub stats: SearchStats,
    /// Why the polygon was not analyzed, if it was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl PolygonReport {
    /// Zero-count report for a polygon that could not be analyzed
    pub fn skipped(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            counts: CategoryCounts::default(),
            tiles: 0,
            stats: SearchStats::default(),
            skipped: Some(reason.into()),
        }
    }
}

/// Counts places per category inside polygons using a places provider
pub struct Analyzer<P: PlacesProvider> {
    provider: P,
    places: PlacesConfig,
    tiling: TilingConfig,
}

impl<P: PlacesProvider> Analyzer<P> {
    pub fn new(provider: P, places: PlacesConfig, tiling: TilingConfig) -> Self {
        Self {
            provider,
            places,
            tiling,
        }
    }

    /// Analyze a single polygon.
    ///
    /// Provider failures never abort the analysis: failed queries are
    /// skipped and reported in [`PolygonReport::stats`].
    pub async fn analyze_polygon(&self, polygon: &SearchPolygon) -> PolygonReport {
        if !polygon.is_valid() {
            warn!(
                "Polygon '{}' has less than 3 points, skipping",
                polygon.name
            );
            return PolygonReport::skipped(&polygon.name, "polygon has less than 3 points");
        }

        let started = Instant::now();
        let tiles = match tile_polygon(&polygon.geometry, &self.tiling) {
            Ok(tiles) => tiles,
            Err(e) => {
                warn!("Skipping polygon '{}': {}", polygon.name, e);
                return PolygonReport::skipped(&polygon.name, e.to_string());
            }
        };
        info!("Analyzing polygon '{}' ({} tiles)", polygon.name, tiles.len());

        let mut session = SearchSession::new(&self.provider, &polygon.geometry, &self.places, &self.tiling);
        let mut counts = CategoryCounts::default();

        for category in Category::all() {
            let queries = SearchPlan::for_category(*category).queries(self.places.text_search);
            let mut counted: HashSet<String> = HashSet::new();
            let mut candidates = 0usize;

            for tile in &tiles {
                for query in &queries {
                    for place in session.run(tile, query).await {
                        candidates += 1;
                        let Some(id) = place.place_id.as_deref() else {
                            continue;
                        };
                        if counted.contains(id) {
                            continue;
                        }
                        let Some(location) = place.location() else {
                            continue;
                        };
                        if polygon.contains(location) && classify::matches(*category, &place) {
                            counted.insert(id.to_string());
                        }
                    }
                }
            }

            debug!(
                "  {}: {} candidates, {} counted",
                category,
                candidates,
                counted.len()
            );
            counts.set(*category, counted.len());
            info!("  Found {} {}", counted.len(), category);
        }

        let stats = session.stats();
        info!(
            "Completed '{}' in {:.1}s: {} places, {} requests, {} failed queries",
            polygon.name,
            started.elapsed().as_secs_f64(),
            counts.total(),
            stats.requests,
            stats.failed_queries
        );

        PolygonReport {
            name: polygon.name.clone(),
            counts,
            tiles: tiles.len(),
            stats,
            skipped: None,
        }
    }

    /// Analyze polygons in order, pausing between them to spare the provider quota
    pub async fn analyze_many(&self, polygons: &[SearchPolygon]) -> Vec<PolygonReport> {
        let total = polygons.len();
        let mut reports = Vec::with_capacity(total);

        for (i, polygon) in polygons.iter().enumerate() {
            info!("[{}/{}] Processing {}", i + 1, total, polygon.name);
            reports.push(self.analyze_polygon(polygon).await);

            if i + 1 < total && self.places.polygon_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.places.polygon_delay_ms)).await;
            }
        }

        reports
    }
}
