//! Travel-time frontier search along compass bearings.
//!
//! Each bearing is searched independently: the ceiling radius is probed
//! first and, if it is out of reach, the reachable distance is narrowed by
//! bisection. The frontier points, in bearing order, form the isochrone.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::routes::RoutingProvider;
use crate::config::IsochroneConfig;
use crate::error::{Error, Result};
use crate::models::LatLng;
use crate::pip::{destination, polygon_to_wkt};

/// Center and time budget of an isochrone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsochroneRequest {
    pub center: LatLng,
    pub minutes: u32,
}

impl IsochroneRequest {
    pub fn new(center: LatLng, minutes: u32) -> Self {
        Self { center, minutes }
    }

    pub fn validate(&self, config: &IsochroneConfig) -> Result<()> {
        if !self.center.is_valid() {
            return Err(Error::InvalidInput(format!(
                "center ({}, {}) outside lat [-90, 90] / lng [-180, 180]",
                self.center.lat, self.center.lng
            )));
        }
        if self.minutes < config.min_minutes || self.minutes > config.max_minutes {
            return Err(Error::InvalidInput(format!(
                "time limit must be between {} and {} minutes",
                config.min_minutes, config.max_minutes
            )));
        }
        Ok(())
    }

    pub fn budget_secs(&self) -> f64 {
        f64::from(self.minutes) * 60.0
    }
}

/// Frontier found along one bearing
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Frontier {
    pub bearing: f64,
    pub distance_m: f64,
    pub point: LatLng,
}

/// Probe accounting across all bearings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProbeStats {
    /// Probes the router answered with a duration
    pub successes: usize,
    /// Probes that errored or had no route
    pub failures: usize,
}

impl ProbeStats {
    fn merge(&mut self, other: ProbeStats) {
        self.successes += other.successes;
        self.failures += other.failures;
    }
}

/// A computed isochrone
#[derive(Debug, Clone, Serialize)]
pub struct Isochrone {
    pub center: LatLng,
    pub minutes: u32,
    /// Non-center frontier points in bearing order
    pub boundary: Vec<Frontier>,
    pub probes: ProbeStats,
}

impl Isochrone {
    pub fn vertices(&self) -> Vec<LatLng> {
        self.boundary.iter().map(|f| f.point).collect()
    }

    pub fn to_wkt(&self) -> Result<String> {
        polygon_to_wkt(&self.vertices())
    }
}

/// Per-bearing binary search over routing travel times
pub struct BoundarySearch<'a, R: RoutingProvider> {
    router: &'a R,
    config: &'a IsochroneConfig,
}

impl<'a, R: RoutingProvider> BoundarySearch<'a, R> {
    pub fn new(router: &'a R, config: &'a IsochroneConfig) -> Self {
        Self { router, config }
    }

    /// Bearings in degrees, evenly spaced clockwise from north
    pub fn bearings(&self) -> Vec<f64> {
        let n = self.config.bearings.max(1);
        (0..n).map(|i| i as f64 * 360.0 / n as f64).collect()
    }

    /// Search radius upper bound for a request
    pub fn ceiling_m(&self, request: &IsochroneRequest) -> f64 {
        request.budget_secs() * self.config.assumed_speed_mps * self.config.radius_slack
    }

    pub async fn run(&self, request: &IsochroneRequest) -> Result<Isochrone> {
        request.validate(self.config)?;

        let started = Instant::now();
        let ceiling = self.ceiling_m(request);
        let budget = request.budget_secs();
        info!(
            "Isochrone at ({:.5}, {:.5}), {} min: {} bearings, ceiling {:.0}m",
            request.center.lat,
            request.center.lng,
            request.minutes,
            self.config.bearings,
            ceiling
        );

        let mut results: Vec<(usize, Frontier, ProbeStats)> = stream::iter(self.bearings().into_iter().enumerate())
            .map(|(idx, bearing)| async move {
                let (frontier, stats) = self.search_bearing(request.center, bearing, ceiling, budget).await;
                (idx, frontier, stats)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;
        results.sort_by_key(|(idx, _, _)| *idx);

        let mut probes = ProbeStats::default();
        let mut boundary = Vec::with_capacity(results.len());
        for (_, frontier, stats) in results {
            probes.merge(stats);
            if frontier.distance_m > 0.0 {
                boundary.push(frontier);
            }
        }

        if boundary.len() < 3 {
            warn!(
                "Only {} reachable bearings ({} successful, {} failed probes)",
                boundary.len(),
                probes.successes,
                probes.failures
            );
            return Err(Error::NotEnoughReachable {
                found: boundary.len(),
                successes: probes.successes,
                failures: probes.failures,
            });
        }

        info!(
            "Isochrone done in {:.1}s: {} boundary points, {} probes ({} failed)",
            started.elapsed().as_secs_f64(),
            boundary.len(),
            probes.successes + probes.failures,
            probes.failures
        );

        Ok(Isochrone {
            center: request.center,
            minutes: request.minutes,
            boundary,
            probes,
        })
    }

    async fn search_bearing(&self, center: LatLng, bearing: f64, ceiling: f64, budget: f64) -> (Frontier, ProbeStats) {
        let mut stats = ProbeStats::default();

        if self.reachable(center, bearing, ceiling, budget, &mut stats).await {
            debug!("Bearing {:.1}: ceiling {:.0}m reachable", bearing, ceiling);
            return (self.frontier(center, bearing, ceiling), stats);
        }

        let (mut lo, mut hi) = (0.0_f64, ceiling);
        let mut iterations = 0;
        while hi - lo > self.config.tolerance_m && iterations < self.config.max_iterations {
            let mid = (lo + hi) / 2.0;
            if self.reachable(center, bearing, mid, budget, &mut stats).await {
                lo = mid;
            } else {
                hi = mid;
            }
            iterations += 1;
        }

        debug!(
            "Bearing {:.1}: frontier {:.0}m after {} iterations",
            bearing, lo, iterations
        );
        (self.frontier(center, bearing, lo), stats)
    }

    async fn reachable(
        &self,
        center: LatLng,
        bearing: f64,
        distance_m: f64,
        budget: f64,
        stats: &mut ProbeStats,
    ) -> bool {
        let target = destination(center, bearing, distance_m);
        match self.router.travel_time(center, target).await {
            Ok(Some(seconds)) => {
                stats.successes += 1;
                seconds <= budget
            }
            Ok(None) => {
                stats.failures += 1;
                false
            }
            Err(e) => {
                debug!("Probe at {:.1} deg / {:.0}m failed: {}", bearing, distance_m, e);
                stats.failures += 1;
                false
            }
        }
    }

    fn frontier(&self, center: LatLng, bearing: f64, distance_m: f64) -> Frontier {
        Frontier {
            bearing,
            distance_m,
            point: if distance_m > 0.0 {
                destination(center, bearing, distance_m)
            } else {
                center
            },
        }
    }
}
