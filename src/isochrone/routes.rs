//! Travel-time lookups against the Google Routes API.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::config::RoutingConfig;
use crate::error::{Error, Result};
use crate::models::LatLng;
use crate::places::truncate;

const FIELD_MASK: &str = "routes.duration,routes.distanceMeters,routes.legs.duration,routes.legs.distanceMeters";

/// Source of point-to-point travel times.
///
/// `Ok(None)` means the provider answered but had no route.
pub trait RoutingProvider: Send + Sync {
    fn travel_time(
        &self,
        origin: LatLng,
        destination: LatLng,
    ) -> impl Future<Output = Result<Option<f64>>> + Send;
}

#[derive(Serialize)]
struct LatLngLiteral {
    latitude: f64,
    longitude: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    lat_lng: LatLngLiteral,
}

#[derive(Serialize)]
struct Waypoint {
    location: Location,
}

impl From<LatLng> for Waypoint {
    fn from(p: LatLng) -> Self {
        Self {
            location: Location {
                lat_lng: LatLngLiteral {
                    latitude: p.lat,
                    longitude: p.lng,
                },
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteRequest<'a> {
    origin: Waypoint,
    destination: Waypoint,
    travel_mode: &'a str,
    routing_preference: &'static str,
    departure_time: String,
}

/// Next occurrence of `hour`:00 UTC strictly after `now`
pub fn next_departure(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let today = now
        .date_naive()
        .and_hms_opt(hour.min(23), 0, 0)
        .map(|t| t.and_utc())
        .unwrap_or(now);

    if today <= now {
        today + ChronoDuration::days(1)
    } else {
        today
    }
}

pub(crate) fn format_departure(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse a duration as the Routes API may render it: `"123s"`, a bare
/// number (or numeric string), or an object with `seconds`/`value`.
pub fn parse_duration_seconds(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            s.strip_suffix('s').unwrap_or(s).trim().parse().ok()
        }
        Value::Object(map) => map
            .get("seconds")
            .or_else(|| map.get("value"))
            .and_then(|inner| match inner {
                Value::Number(_) | Value::String(_) => parse_duration_seconds(inner),
                _ => None,
            }),
        _ => None,
    }
}

/// Duration of the first route, falling back to the sum of its legs
fn route_duration(body: &Value) -> Option<f64> {
    let route = body.get("routes")?.as_array()?.first()?;

    if let Some(total) = route.get("duration").and_then(parse_duration_seconds) {
        return Some(total);
    }

    let legs: f64 = route
        .get("legs")
        .and_then(Value::as_array)
        .map(|legs| {
            legs.iter()
                .filter_map(|leg| leg.get("duration").and_then(parse_duration_seconds))
                .sum()
        })
        .unwrap_or(0.0);

    (legs > 0.0).then_some(legs)
}

/// HTTP client for `computeRoutes`
pub struct GoogleRoutesClient {
    client: Client,
    endpoint: String,
    api_key: String,
    modes: Vec<String>,
    departure_hour_utc: u32,
}

impl GoogleRoutesClient {
    pub fn new(api_key: &str, config: &RoutingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.to_string(),
            modes: config.modes.clone(),
            departure_hour_utc: config.departure_hour_utc,
        })
    }

    async fn route(&self, origin: LatLng, destination: LatLng, mode: &str) -> Result<Option<f64>> {
        let request = RouteRequest {
            origin: origin.into(),
            destination: destination.into(),
            travel_mode: mode,
            routing_preference: "TRAFFIC_AWARE",
            departure_time: format_departure(next_departure(Utc::now(), self.departure_hour_utc)),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider("routes", status.to_string(), truncate(&body, 200)));
        }

        let body: Value = response.json().await?;
        if let Some(err) = body.get("error") {
            let code = err.get("code").map(|c| c.to_string()).unwrap_or_else(|| "?".to_string());
            let message = err.get("message").and_then(Value::as_str).unwrap_or("unknown");
            return Err(Error::provider("routes", code, message));
        }

        Ok(route_duration(&body))
    }
}

impl RoutingProvider for GoogleRoutesClient {
    /// Tries each configured travel mode in order until one yields a duration
    async fn travel_time(&self, origin: LatLng, destination: LatLng) -> Result<Option<f64>> {
        let mut last_error = None;
        let mut answered = false;

        for mode in &self.modes {
            match self.route(origin, destination, mode).await {
                Ok(Some(seconds)) => return Ok(Some(seconds)),
                Ok(None) => {
                    debug!("No {} route to ({:.5}, {:.5})", mode, destination.lat, destination.lng);
                    answered = true;
                }
                Err(e) => {
                    debug!("{} routing failed: {}", mode, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_parse_duration_formats() {
        assert_eq!(parse_duration_seconds(&json!("123s")), Some(123.0));
        assert_eq!(parse_duration_seconds(&json!(" 45.5s ")), Some(45.5));
        assert_eq!(parse_duration_seconds(&json!("60")), Some(60.0));
        assert_eq!(parse_duration_seconds(&json!(90)), Some(90.0));
        assert_eq!(parse_duration_seconds(&json!({"seconds": "30"})), Some(30.0));
        assert_eq!(parse_duration_seconds(&json!({"value": 12})), Some(12.0));
        assert_eq!(parse_duration_seconds(&json!("abc")), None);
        assert_eq!(parse_duration_seconds(&json!(null)), None);
        assert_eq!(parse_duration_seconds(&json!({"nanos": 5})), None);
    }

    #[test]
    fn test_route_duration_prefers_total() {
        let body = json!({"routes": [{"duration": "300s", "legs": [{"duration": "10s"}]}]});
        assert_eq!(route_duration(&body), Some(300.0));
    }

    #[test]
    fn test_route_duration_sums_legs() {
        let body = json!({"routes": [{"legs": [{"duration": "100s"}, {"duration": {"seconds": 50}}, {}]}]});
        assert_eq!(route_duration(&body), Some(150.0));

        let no_legs = json!({"routes": [{"legs": []}]});
        assert_eq!(route_duration(&no_legs), None);
        assert_eq!(route_duration(&json!({})), None);
        assert_eq!(route_duration(&json!({"routes": []})), None);
    }

    #[test]
    fn test_next_departure() {
        let morning = Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap();
        assert_eq!(
            format_departure(next_departure(morning, 18)),
            "2026-03-10T18:00:00Z"
        );

        let evening = Utc.with_ymd_and_hms(2026, 3, 10, 19, 0, 0).unwrap();
        assert_eq!(
            format_departure(next_departure(evening, 18)),
            "2026-03-11T18:00:00Z"
        );
    }

    #[test]
    fn test_request_payload_shape() {
        let request = RouteRequest {
            origin: LatLng::new(12.9, 77.6).into(),
            destination: LatLng::new(13.0, 77.7).into(),
            travel_mode: "DRIVE",
            routing_preference: "TRAFFIC_AWARE",
            departure_time: "2026-03-10T18:00:00Z".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["origin"]["location"]["latLng"]["latitude"], json!(12.9));
        assert_eq!(value["destination"]["location"]["latLng"]["longitude"], json!(77.7));
        assert_eq!(value["travelMode"], json!("DRIVE"));
        assert_eq!(value["routingPreference"], json!("TRAFFIC_AWARE"));
        assert_eq!(value["departureTime"], json!("2026-03-10T18:00:00Z"));
    }
}
