//! Provider-computed isochrones from the Mapbox Isochrone API.

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::routes::{format_departure, next_departure};
use crate::config::MapboxConfig;
use crate::error::{Error, Result};
use crate::models::LatLng;
use crate::pip::polygon_to_wkt;
use crate::places::truncate;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

type Ring = Vec<[f64; 2]>;

/// Outer ring of a Polygon, or the longest outer ring of a MultiPolygon
fn outer_ring(geometry: &Geometry) -> Option<Ring> {
    match geometry.kind.as_str() {
        "Polygon" => {
            let rings: Vec<Ring> = serde_json::from_value(geometry.coordinates.clone()).ok()?;
            rings.into_iter().next().filter(|r| !r.is_empty())
        }
        "MultiPolygon" => {
            let polygons: Vec<Vec<Ring>> = serde_json::from_value(geometry.coordinates.clone()).ok()?;
            polygons
                .into_iter()
                .filter_map(|p| p.into_iter().next())
                .filter(|r| !r.is_empty())
                .max_by_key(|r| r.len())
        }
        _ => None,
    }
}

fn ring_to_wkt(ring: &Ring) -> Result<String> {
    // polygon_to_wkt closes the ring itself
    let vertices: Vec<LatLng> = ring.iter().map(|[lng, lat]| LatLng::new(*lat, *lng)).collect();
    polygon_to_wkt(&vertices)
}

fn retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// HTTP client for the Mapbox Isochrone API
pub struct MapboxIsochroneClient {
    client: Client,
    token: String,
    config: MapboxConfig,
}

impl MapboxIsochroneClient {
    pub fn new(token: &str, config: &MapboxConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            token: token.to_string(),
            config: config.clone(),
        })
    }

    pub fn request_url(
        &self,
        center: LatLng,
        minutes: u32,
        profile: Option<&str>,
        depart_at: Option<&str>,
    ) -> Result<Url> {
        let profile = profile.unwrap_or(&self.config.profile);
        let mut url = Url::parse(&format!(
            "{}/{}/{},{}",
            self.config.endpoint.trim_end_matches('/'),
            profile,
            center.lng,
            center.lat
        ))?;

        // traffic-aware profile needs a departure; default to the evening peak
        let depart_at = match depart_at {
            Some(d) => Some(d.to_string()),
            None if profile == "driving-traffic" => Some(format_departure(next_departure(Utc::now(), 18))),
            None => None,
        };

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("contours_minutes", &minutes.to_string());
            pairs.append_pair("polygons", "true");
            pairs.append_pair("denoise", &self.config.denoise.to_string());
            pairs.append_pair("generalize", &self.config.generalize_m.to_string());
            if let Some(depart_at) = &depart_at {
                pairs.append_pair("depart_at", depart_at);
            }
            pairs.append_pair("access_token", &self.token);
        }

        Ok(url)
    }

    /// Fetch an isochrone and return its outer ring as WKT
    pub async fn isochrone_wkt(
        &self,
        center: LatLng,
        minutes: u32,
        profile: Option<&str>,
        depart_at: Option<&str>,
    ) -> Result<String> {
        if !center.is_valid() {
            return Err(Error::InvalidInput(format!(
                "center ({}, {}) outside lat [-90, 90] / lng [-180, 180]",
                center.lat, center.lng
            )));
        }

        let url = self.request_url(center, minutes, profile, depart_at)?;
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();

            if status.is_success() {
                let body: FeatureCollection = response.json().await?;
                return parse_isochrone(body);
            }

            let text = response.text().await.unwrap_or_default();
            if retryable(status) && attempts < max_attempts {
                let backoff = Duration::from_millis(700 * 2u64.pow(attempts - 1));
                warn!(
                    "Mapbox returned {} (attempt {}/{}), retrying in {:?}",
                    status, attempts, max_attempts, backoff
                );
                tokio::time::sleep(backoff).await;
                continue;
            }

            return Err(Error::provider("mapbox", status.to_string(), truncate(&text, 800)));
        }
    }
}

fn parse_isochrone(body: FeatureCollection) -> Result<String> {
    let geometry = body
        .features
        .into_iter()
        .next()
        .and_then(|f| f.geometry)
        .ok_or_else(|| Error::provider("mapbox", "200", "response has no features"))?;

    let ring = outer_ring(&geometry)
        .ok_or_else(|| Error::Polygon(format!("could not extract a ring from {} geometry", geometry.kind)))?;
    debug!("Mapbox ring with {} coordinates", ring.len());

    ring_to_wkt(&ring)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MapboxIsochroneClient {
        MapboxIsochroneClient::new("tok", &MapboxConfig::default()).unwrap()
    }

    fn parse(json: &str) -> Result<String> {
        parse_isochrone(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_request_url() {
        let url = client()
            .request_url(LatLng::new(12.97, 77.59), 15, None, None)
            .unwrap();
        assert!(url.path().ends_with("/driving/77.59,12.97"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("contours_minutes".into(), "15".into())));
        assert!(pairs.contains(&("polygons".into(), "true".into())));
        assert!(pairs.contains(&("access_token".into(), "tok".into())));
        assert!(!pairs.iter().any(|(k, _)| k == "depart_at"));
    }

    #[test]
    fn test_traffic_profile_gets_departure() {
        let url = client()
            .request_url(LatLng::new(12.97, 77.59), 10, Some("driving-traffic"), None)
            .unwrap();
        let depart = url
            .query_pairs()
            .find(|(k, _)| k == "depart_at")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert!(depart.ends_with("T18:00:00Z"));
    }

    #[test]
    fn test_polygon_ring_is_closed() {
        let wkt = parse(
            r#"{"features": [{"geometry": {"type": "Polygon",
                "coordinates": [[[77.0, 12.0], [77.1, 12.0], [77.1, 12.1]]]}}]}"#,
        )
        .unwrap();
        assert_eq!(wkt, "POLYGON((77 12, 77.1 12, 77.1 12.1, 77 12))");
    }

    #[test]
    fn test_multipolygon_picks_longest_ring() {
        let wkt = parse(
            r#"{"features": [{"geometry": {"type": "MultiPolygon", "coordinates": [
                [[[1.0, 1.0], [1.1, 1.0], [1.1, 1.1], [1.0, 1.0]]],
                [[[2.0, 2.0], [2.1, 2.0], [2.1, 2.1], [2.0, 2.1], [2.0, 2.0]]]
            ]}}]}"#,
        )
        .unwrap();
        assert!(wkt.starts_with("POLYGON((2 2,"));
    }

    #[test]
    fn test_empty_or_odd_responses_fail() {
        assert!(parse(r#"{"features": []}"#).is_err());
        assert!(parse(r#"{"features": [{"geometry": {"type": "Point", "coordinates": [1, 2]}}]}"#).is_err());
        assert!(parse(r#"{"features": [{"geometry": {"type": "Polygon", "coordinates": []}}]}"#).is_err());
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(retryable(StatusCode::BAD_GATEWAY));
        assert!(!retryable(StatusCode::UNAUTHORIZED));
    }
}
