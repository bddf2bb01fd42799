//! Request handlers and wire types.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use poi_density::isochrone::{BoundarySearch, GoogleRoutesClient, IsochroneRequest, MapboxIsochroneClient};
use poi_density::places::GooglePlacesClient;
use poi_density::report::{polygon_csv, results_to_csv, PolygonRow, PolygonTable};
use poi_density::{Analyzer, Config, Error, LatLng, PolygonReport, SearchPolygon, Summary};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub analyzer: Option<Analyzer<GooglePlacesClient>>,
    pub router: Option<GoogleRoutesClient>,
    pub mapbox: Option<MapboxIsochroneClient>,
}

/// JSON error body with an HTTP status
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::InvalidInput(_) | Error::Polygon(_) | Error::MissingColumn { .. } => StatusCode::BAD_REQUEST,
            Error::NotEnoughReachable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Provider { .. } | Error::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct PolygonInput {
    pub name: String,
    pub wkt: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeBody {
    pub polygons: Vec<PolygonInput>,
    /// Overrides the server's key for this request
    #[serde(default)]
    pub google_maps_api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub reports: Vec<PolygonReport>,
    /// Result table in the batch output format
    pub csv: String,
    pub summary: Summary,
}

impl AnalyzeResponse {
    fn new(inputs: &[PolygonInput], reports: Vec<PolygonReport>) -> Result<Self, ApiError> {
        let table = PolygonTable {
            headers: vec!["WKT".to_string(), "name".to_string()],
            rows: inputs
                .iter()
                .map(|p| PolygonRow {
                    record: vec![p.wkt.clone(), p.name.clone()],
                    name: p.name.trim().to_string(),
                    wkt: p.wkt.clone(),
                })
                .collect(),
        };
        let counts: Vec<_> = reports.iter().map(|r| r.counts).collect();
        let csv = results_to_csv(&table, &counts)?;

        Ok(Self {
            summary: Summary::from_reports(&reports),
            reports,
            csv,
        })
    }
}

/// Analyze polygons given as WKT
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnalyzeBody>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    if body.polygons.is_empty() {
        return Err(ApiError::bad_request("at least one polygon is required"));
    }
    if body.polygons.iter().all(|p| p.wkt.trim().is_empty()) {
        return Err(ApiError::bad_request("WKT is empty for every polygon"));
    }

    let polygons: Vec<SearchPolygon> = body
        .polygons
        .iter()
        .map(|p| SearchPolygon::from_wkt(p.name.trim(), &p.wkt))
        .collect();

    let api_key = body.google_maps_api_key.as_deref().filter(|k| !k.trim().is_empty());
    let reports = match (api_key, &state.analyzer) {
        (Some(key), _) => {
            let client = GooglePlacesClient::new(key, &state.config.places)?;
            let analyzer = Analyzer::new(client, state.config.places.clone(), state.config.tiling.clone());
            info!("Analyzing {} polygons with the request key", polygons.len());
            analyzer.analyze_many(&polygons).await
        }
        (None, Some(analyzer)) => {
            info!("Analyzing {} polygons", polygons.len());
            analyzer.analyze_many(&polygons).await
        }
        (None, None) => return Err(ApiError::unavailable("places API key is not configured")),
    };

    Ok(Json(AnalyzeResponse::new(&body.polygons, reports)?))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsochroneMethod {
    /// Provider-computed isochrone
    #[default]
    Mapbox,
    /// Per-bearing frontier search over routing times
    Bearing,
}

#[derive(Debug, Deserialize)]
pub struct IsochroneBody {
    pub center_lat: f64,
    pub center_lng: f64,
    pub time_limit_minutes: u32,
    pub polygon_name: String,
    #[serde(default)]
    pub method: IsochroneMethod,
    pub routing_profile: Option<String>,
    pub depart_at: Option<String>,
    pub mapbox_token: Option<String>,
}

impl IsochroneBody {
    fn validate(&self, config: &Config) -> Result<IsochroneRequest, ApiError> {
        if !(-90.0..=90.0).contains(&self.center_lat) {
            return Err(ApiError::bad_request("Latitude must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&self.center_lng) {
            return Err(ApiError::bad_request("Longitude must be between -180 and 180"));
        }

        let request = IsochroneRequest::new(LatLng::new(self.center_lat, self.center_lng), self.time_limit_minutes);
        request.validate(&config.isochrone)?;
        Ok(request)
    }
}

#[derive(Debug, Serialize)]
pub struct IsochroneResponse {
    pub wkt: String,
    pub polygon_name: String,
    pub csv: String,
}

/// Generate an isochrone polygon
pub async fn isochrone_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IsochroneBody>,
) -> Result<Json<IsochroneResponse>, ApiError> {
    let request = body.validate(&state.config)?;

    let wkt = match body.method {
        IsochroneMethod::Mapbox => {
            let profile = body.routing_profile.as_deref();
            let depart_at = body.depart_at.as_deref();
            match (&body.mapbox_token, &state.mapbox) {
                (Some(token), _) => {
                    MapboxIsochroneClient::new(token, &state.config.mapbox)?
                        .isochrone_wkt(request.center, request.minutes, profile, depart_at)
                        .await?
                }
                (None, Some(client)) => {
                    client
                        .isochrone_wkt(request.center, request.minutes, profile, depart_at)
                        .await?
                }
                (None, None) => return Err(ApiError::bad_request("Mapbox API token is required")),
            }
        }
        IsochroneMethod::Bearing => {
            let router = state
                .router
                .as_ref()
                .ok_or_else(|| ApiError::unavailable("routing API key is not configured"))?;
            BoundarySearch::new(router, &state.config.isochrone)
                .run(&request)
                .await?
                .to_wkt()?
        }
    };

    let csv = polygon_csv(&wkt, &body.polygon_name)?;
    Ok(Json(IsochroneResponse {
        wkt,
        polygon_name: body.polygon_name,
        csv,
    }))
}
