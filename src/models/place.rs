//! Place records returned by the places provider.

use serde::{Deserialize, Serialize};

/// Geographic point (lat/lng, WGS84 degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether the coordinate lies in the valid WGS84 range
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl From<LatLng> for geo::Coord<f64> {
    fn from(p: LatLng) -> Self {
        geo::Coord { x: p.lng, y: p.lat }
    }
}

impl From<geo::Coord<f64>> for LatLng {
    fn from(c: geo::Coord<f64>) -> Self {
        LatLng { lat: c.y, lng: c.x }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceGeometry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LatLng>,
}

/// A place as reported by the search provider.
///
/// Only the fields the classifier and the deduplicator read are kept; the
/// provider sends many more.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Place {
    /// Provider-wide unique identifier
    #[serde(default)]
    pub place_id: Option<String>,

    #[serde(default)]
    pub name: String,

    /// Declared provider types (e.g. ["restaurant", "food", "point_of_interest"])
    #[serde(default)]
    pub types: Vec<String>,

    #[serde(default)]
    pub geometry: PlaceGeometry,
}

impl Place {
    /// Create a place with the fields used for counting
    pub fn new(place_id: &str, name: &str, types: &[&str], location: LatLng) -> Self {
        Self {
            place_id: Some(place_id.to_string()),
            name: name.to_string(),
            types: types.iter().map(|t| t.to_string()).collect(),
            geometry: PlaceGeometry {
                location: Some(location),
            },
        }
    }

    pub fn location(&self) -> Option<LatLng> {
        self.geometry.location
    }

    /// Name lowercased for keyword matching
    pub fn normalized_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// Types lowercased for type matching
    pub fn normalized_types(&self) -> Vec<String> {
        self.types.iter().map(|t| t.to_lowercase()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_provider_record() {
        let json = r#"{
            "place_id": "ChIJ123",
            "name": "Juice Junction",
            "types": ["cafe", "food", "point_of_interest"],
            "geometry": {"location": {"lat": 12.97, "lng": 77.59}, "viewport": {}},
            "rating": 4.3
        }"#;
        let place: Place = serde_json::from_str(json).unwrap();
        assert_eq!(place.place_id.as_deref(), Some("ChIJ123"));
        assert_eq!(place.types.len(), 3);
        assert_eq!(place.location(), Some(LatLng::new(12.97, 77.59)));
    }

    #[test]
    fn test_deserialize_sparse_record() {
        let place: Place = serde_json::from_str(r#"{"name": "Nameless"}"#).unwrap();
        assert!(place.place_id.is_none());
        assert!(place.location().is_none());
    }

    #[test]
    fn test_latlng_validity() {
        assert!(LatLng::new(12.9, 77.6).is_valid());
        assert!(!LatLng::new(91.0, 0.0).is_valid());
        assert!(!LatLng::new(0.0, f64::NAN).is_valid());
    }
}
