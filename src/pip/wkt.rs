//! WKT polygon text parsing and formatting.
//!
//! WKT stores `lng lat` pairs; everything handed back to callers is
//! latitude/longitude.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::models::LatLng;

fn double_paren() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)POLYGON\s*\(\((.*?)\)\)").unwrap())
}

fn single_paren() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)POLYGON\s*\((.*?)\)").unwrap())
}

fn any_paren() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\((.*?)\)").unwrap())
}

/// Parse a WKT polygon (or a bare coordinate list) into lat/lng vertices.
///
/// Accepted forms: `POLYGON((lng lat, ...))`, `POLYGON ((...))`,
/// `POLYGON(...)` and `(lng lat, ...)`, optionally quoted. Only the exterior
/// ring is read; interior rings are ignored. Pairs that do not parse are
/// skipped, and a closing vertex equal to the first is dropped.
pub fn parse_wkt_polygon(text: &str) -> Vec<LatLng> {
    let text = text.trim().trim_matches('"').trim_matches('\'').trim();

    let coords = if text.to_uppercase().starts_with("POLYGON") {
        double_paren()
            .captures(text)
            .or_else(|| single_paren().captures(text))
            .or_else(|| any_paren().captures(text))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(text)
    } else {
        text.trim_matches(|c| c == '(' || c == ')')
    };
    // exterior ring ends at the first closing paren
    let coords = coords.split(')').next().unwrap_or(coords);

    let mut vertices: Vec<LatLng> = coords
        .split(',')
        .filter_map(|pair| {
            let mut parts = pair.split_whitespace();
            let lng = parts.next()?.trim_matches(|c| c == '(' || c == ')').parse::<f64>().ok()?;
            let lat = parts.next()?.trim_matches(|c| c == '(' || c == ')').parse::<f64>().ok()?;
            Some(LatLng::new(lat, lng))
        })
        .collect();

    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }

    vertices
}

/// Format lat/lng vertices as `POLYGON((lng lat, ...))` with a closed ring.
pub fn polygon_to_wkt(vertices: &[LatLng]) -> Result<String> {
    if vertices.len() < 3 {
        return Err(Error::Polygon(format!(
            "polygon must have at least 3 points, got {}",
            vertices.len()
        )));
    }

    let mut ring: Vec<String> = vertices.iter().map(|p| format!("{} {}", p.lng, p.lat)).collect();
    if vertices.first() != vertices.last() {
        ring.push(format!("{} {}", vertices[0].lng, vertices[0].lat));
    }

    Ok(format!("POLYGON(({}))", ring.join(", ")))
}
