//! Command-line front end.
//!
//! Runs batch polygon analysis from CSV, analyzes single WKT polygons and
//! generates isochrone polygons.

mod batch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use poi_density::isochrone::{BoundarySearch, GoogleRoutesClient, IsochroneRequest, MapboxIsochroneClient};
use poi_density::places::GooglePlacesClient;
use poi_density::report::polygon_csv;
use poi_density::{Analyzer, Config, LatLng, SearchPolygon};

#[derive(Parser, Debug)]
#[command(name = "density")]
#[command(about = "Count places by category inside polygons")]
struct Args {
    /// TOML config file (all settings have defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze every polygon in a CSV with `WKT` and `name` columns
    Analyze {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Skip polygons already present in the output and append the rest
        #[arg(long)]
        resume: bool,

        #[arg(long, env = "GOOGLE_MAPS_API_KEY", hide_env_values = true)]
        api_key: String,
    },

    /// Analyze a single WKT polygon and print the report as JSON
    Wkt {
        #[arg(long)]
        wkt: String,

        #[arg(long, default_value = "polygon")]
        name: String,

        #[arg(long, env = "GOOGLE_MAPS_API_KEY", hide_env_values = true)]
        api_key: String,
    },

    /// Generate an isochrone polygon around a point
    Isochrone {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        #[arg(long, default_value = "20")]
        minutes: u32,

        #[arg(long, default_value = "isochrone")]
        name: String,

        /// Use the Mapbox Isochrone API instead of the bearing search
        #[arg(long)]
        mapbox: bool,

        /// Mapbox routing profile (driving, driving-traffic, walking, cycling)
        #[arg(long)]
        profile: Option<String>,

        #[arg(long, env = "GOOGLE_MAPS_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        #[arg(long, env = "MAPBOX_API_TOKEN", hide_env_values = true)]
        mapbox_token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    match args.command {
        Command::Analyze {
            input,
            output,
            resume,
            api_key,
        } => batch::run(&config, &api_key, &input, &output, resume).await,

        Command::Wkt { wkt, name, api_key } => {
            let polygon = SearchPolygon::from_wkt(name, &wkt);
            if !polygon.is_valid() {
                anyhow::bail!("WKT must describe a polygon with at least 3 points");
            }

            let client = GooglePlacesClient::new(&api_key, &config.places)?;
            let analyzer = Analyzer::new(client, config.places.clone(), config.tiling.clone());
            let report = analyzer.analyze_polygon(&polygon).await;

            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        Command::Isochrone {
            lat,
            lng,
            minutes,
            name,
            mapbox,
            profile,
            api_key,
            mapbox_token,
        } => {
            let request = isochrone_request(&config, lat, lng, minutes)?;

            let wkt = if mapbox {
                let token = mapbox_token.context("--mapbox-token or MAPBOX_API_TOKEN is required")?;
                let client = MapboxIsochroneClient::new(&token, &config.mapbox)?;
                client
                    .isochrone_wkt(request.center, request.minutes, profile.as_deref(), None)
                    .await
                    .context("Mapbox isochrone request failed")?
            } else {
                let key = api_key.context("--api-key or GOOGLE_MAPS_API_KEY is required")?;
                let router = GoogleRoutesClient::new(&key, &config.routing)?;
                let isochrone = BoundarySearch::new(&router, &config.isochrone)
                    .run(&request)
                    .await
                    .context("Isochrone search failed")?;
                info!(
                    "{} boundary points from {} probes",
                    isochrone.boundary.len(),
                    isochrone.probes.successes + isochrone.probes.failures
                );
                isochrone.to_wkt()?
            };

            println!("{}", wkt);
            print!("{}", polygon_csv(&wkt, &name)?);
            Ok(())
        }
    }
}

/// Checked isochrone request, shared by both providers
fn isochrone_request(config: &Config, lat: f64, lng: f64, minutes: u32) -> Result<IsochroneRequest> {
    let request = IsochroneRequest::new(LatLng::new(lat, lng), minutes);
    request.validate(&config.isochrone)?;
    Ok(request)
}
