//! Isochrone generation: bearing-wise frontier search over a routing
//! provider, plus a client for provider-computed isochrones.

mod boundary;
mod mapbox;
mod routes;

pub use boundary::{BoundarySearch, Frontier, Isochrone, IsochroneRequest, ProbeStats};
pub use mapbox::MapboxIsochroneClient;
pub use routes::{next_departure, parse_duration_seconds, GoogleRoutesClient, RoutingProvider};
