//! Google Places (nearby and text search) client.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::provider::{PlaceQuery, PlacesPage, PlacesProvider};
use crate::config::PlacesConfig;
use crate::error::{Error, Result};
use crate::models::Place;
use crate::pip::SearchTile;

const USER_AGENT: &str = "poi-density/0.1";

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    results: Vec<Place>,
    next_page_token: Option<String>,
    status: String,
    error_message: Option<String>,
}

/// HTTP client for the Google Places web service
pub struct GooglePlacesClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GooglePlacesClient {
    pub fn new(api_key: &str, config: &PlacesConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Build the request URL for a query page
    pub fn request_url(
        &self,
        tile: &SearchTile,
        query: &PlaceQuery,
        page_token: Option<&str>,
    ) -> Result<Url> {
        let path = match query {
            PlaceQuery::Text(_) => "textsearch/json",
            _ => "nearbysearch/json",
        };
        let mut url = Url::parse(&format!("{}/{}", self.endpoint, path))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("location", &format!("{},{}", tile.center.lat, tile.center.lng));
            pairs.append_pair("radius", &tile.radius_m.to_string());
            match query {
                PlaceQuery::Type(t) => {
                    pairs.append_pair("type", t);
                }
                PlaceQuery::Keyword(k) => {
                    pairs.append_pair("keyword", k);
                }
                PlaceQuery::Text(q) => {
                    pairs.append_pair("query", q);
                }
            }
            if let Some(token) = page_token {
                pairs.append_pair("pagetoken", token);
            }
            pairs.append_pair("key", &self.api_key);
        }

        Ok(url)
    }
}

impl PlacesProvider for GooglePlacesClient {
    async fn search_page(
        &self,
        tile: &SearchTile,
        query: &PlaceQuery,
        page_token: Option<&str>,
    ) -> Result<PlacesPage> {
        let url = self.request_url(tile, query, page_token)?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider("places", status.to_string(), truncate(&body, 800)));
        }

        let data: PlacesResponse = response.json().await?;
        parse_status(data)
    }
}

fn parse_status(data: PlacesResponse) -> Result<PlacesPage> {
    match data.status.as_str() {
        "OK" | "ZERO_RESULTS" => {
            debug!(
                "Places page: {} results, more: {}",
                data.results.len(),
                data.next_page_token.is_some()
            );
            Ok(PlacesPage {
                results: data.results,
                next_page_token: data.next_page_token,
            })
        }
        _ => Err(Error::provider(
            "places",
            data.status,
            data.error_message.unwrap_or_default(),
        )),
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, Rect};

    fn tile() -> SearchTile {
        SearchTile::with_radius(
            Rect::new(coord! { x: 77.59, y: 12.97 }, coord! { x: 77.60, y: 12.98 }),
            800,
        )
    }

    fn client() -> GooglePlacesClient {
        GooglePlacesClient::new("test-key", &PlacesConfig::default()).unwrap()
    }

    #[test]
    fn test_nearby_type_url() {
        let url = client().request_url(&tile(), &PlaceQuery::Type("cafe"), None).unwrap();
        assert!(url.path().ends_with("/nearbysearch/json"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("type".into(), "cafe".into())));
        assert!(pairs.contains(&("radius".into(), "800".into())));
        assert!(pairs.contains(&("key".into(), "test-key".into())));
        assert!(!pairs.iter().any(|(k, _)| k == "pagetoken"));
    }

    #[test]
    fn test_text_query_with_token_url() {
        let url = client()
            .request_url(&tile(), &PlaceQuery::Text("paying guest"), Some("tok"))
            .unwrap();
        assert!(url.path().ends_with("/textsearch/json"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("query".into(), "paying guest".into())));
        assert!(pairs.contains(&("pagetoken".into(), "tok".into())));
    }

    #[test]
    fn test_parse_ok_and_zero_results() {
        let ok: PlacesResponse = serde_json::from_str(
            r#"{"results": [{"place_id": "a", "name": "A"}], "next_page_token": "t", "status": "OK"}"#,
        )
        .unwrap();
        let page = parse_status(ok).unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("t"));

        let zero: PlacesResponse =
            serde_json::from_str(r#"{"results": [], "status": "ZERO_RESULTS"}"#).unwrap();
        assert!(parse_status(zero).unwrap().results.is_empty());
    }

    #[test]
    fn test_parse_denied_is_error() {
        let denied: PlacesResponse = serde_json::from_str(
            r#"{"results": [], "status": "REQUEST_DENIED", "error_message": "bad key"}"#,
        )
        .unwrap();
        let err = parse_status(denied).unwrap_err();
        assert!(err.to_string().contains("REQUEST_DENIED"));
        assert!(err.to_string().contains("bad key"));
    }
}
