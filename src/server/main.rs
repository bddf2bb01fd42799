//! HTTP server for polygon analysis and isochrone generation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::post, Router};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use poi_density::isochrone::{GoogleRoutesClient, MapboxIsochroneClient};
use poi_density::places::GooglePlacesClient;
use poi_density::{Analyzer, Config};

mod api;
use api::{analyze_handler, isochrone_handler, AppState};

#[derive(Parser, Debug)]
#[command(name = "density-server")]
#[command(about = "POI density and isochrone HTTP API")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:5000")]
    listen: String,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, env = "GOOGLE_MAPS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "MAPBOX_API_TOKEN", hide_env_values = true)]
    mapbox_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("POI density server");

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let (analyzer, router) = match &args.api_key {
        Some(key) => {
            let places = GooglePlacesClient::new(key, &config.places)?;
            let routes = GoogleRoutesClient::new(key, &config.routing)?;
            (
                Some(Analyzer::new(places, config.places.clone(), config.tiling.clone())),
                Some(routes),
            )
        }
        None => {
            warn!("No Google Maps API key; /v1/analyze and bearing isochrones are disabled");
            (None, None)
        }
    };

    let mapbox = args
        .mapbox_token
        .as_deref()
        .map(|token| MapboxIsochroneClient::new(token, &config.mapbox))
        .transpose()?;

    let state = Arc::new(AppState {
        config,
        analyzer,
        router,
        mapbox,
    });

    // Build router
    let app = Router::new()
        .route("/v1/analyze", post(analyze_handler))
        .route("/v1/isochrone", post(isochrone_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
