//! Runtime configuration loaded from TOML.
//!
//! Every section has defaults, so an empty file (or no file at all) is a
//! valid configuration.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub places: PlacesConfig,
    pub tiling: TilingConfig,
    pub isochrone: IsochroneConfig,
    pub routing: RoutingConfig,
    pub mapbox: MapboxConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PlacesConfig {
    pub endpoint: String,
    /// Result pages followed per query (the provider serves 20 per page, 60 max)
    pub max_pages: usize,
    pub page_delay_ms: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    /// Issue a text search for every keyword in addition to the nearby search
    pub text_search: bool,
    pub polygon_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://maps.googleapis.com/maps/api/place".to_string(),
            max_pages: 3,
            page_delay_ms: 2000,
            max_attempts: 2,
            retry_delay_ms: 2000,
            text_search: true,
            polygon_delay_ms: 1000,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TilingConfig {
    pub max_tile_radius_m: f64,
    pub min_tile_radius_m: f64,
    /// Results at which a tile counts as saturated and gets subdivided
    pub saturation: usize,
    /// Polygons needing more tiles than this are skipped
    pub max_tiles: usize,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            max_tile_radius_m: 1500.0,
            min_tile_radius_m: 250.0,
            saturation: 60,
            max_tiles: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IsochroneConfig {
    pub bearings: usize,
    pub min_minutes: u32,
    pub max_minutes: u32,
    pub assumed_speed_mps: f64,
    pub radius_slack: f64,
    pub tolerance_m: f64,
    pub max_iterations: u32,
    pub concurrency: usize,
}

impl Default for IsochroneConfig {
    fn default() -> Self {
        Self {
            bearings: 16,
            min_minutes: 1,
            max_minutes: 20,
            assumed_speed_mps: 8.3,
            radius_slack: 1.3,
            tolerance_m: 100.0,
            max_iterations: 12,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RoutingConfig {
    pub endpoint: String,
    /// Travel modes tried in order until one yields a duration
    pub modes: Vec<String>,
    /// Departure hour (UTC) used for traffic-aware routing
    pub departure_hour_utc: u32,
    pub timeout_secs: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://routes.googleapis.com/directions/v2:computeRoutes".to_string(),
            modes: vec!["DRIVE".to_string(), "TWO_WHEELER".to_string()],
            departure_hour_utc: 18,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapboxConfig {
    pub endpoint: String,
    pub profile: String,
    pub denoise: f64,
    pub generalize_m: f64,
    pub max_attempts: u32,
    pub timeout_secs: u64,
}

impl Default for MapboxConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.mapbox.com/isochrone/v1/mapbox".to_string(),
            profile: "driving".to_string(),
            denoise: 0.0,
            generalize_m: 0.0,
            max_attempts: 3,
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.places.max_pages, 3);
        assert_eq!(config.isochrone.bearings, 16);
        assert_eq!(config.routing.modes, vec!["DRIVE", "TWO_WHEELER"]);
    }

    #[test]
    fn test_partial_section_override() {
        let config: Config = toml::from_str(
            r#"
            [tiling]
            max_tile_radius_m = 800.0

            [isochrone]
            bearings = 24
            "#,
        )
        .unwrap();
        assert_eq!(config.tiling.max_tile_radius_m, 800.0);
        assert_eq!(config.tiling.min_tile_radius_m, 250.0);
        assert_eq!(config.tiling.max_tiles, 5000);
        assert_eq!(config.isochrone.bearings, 24);
        assert_eq!(config.isochrone.max_minutes, 20);
    }
}
