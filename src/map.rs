//! Map assembly over geocoded listings.
//!
//! Locations carrying the unresolved sentinel are skipped silently per
//! marker; only a fully empty render is worth a warning. The rendered
//! artifact is a self-contained Leaflet document.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::geocode::Geocoder;
use crate::schema::PropertyLocation;

const DEFAULT_ZOOM: u8 = 12;

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub name: String,
    pub price: String,
    pub address: String,
    pub url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Renderable map: a center, a zoom level, one marker per resolved listing.
#[derive(Debug, Clone)]
pub struct PropertyMap {
    pub center: (f64, f64),
    pub zoom: u8,
    pub markers: Vec<Marker>,
}

/// Build the map for a run. Center is the arithmetic mean of all resolved
/// coordinates; with none resolved (or no locations at all) the city-level
/// geocode is the center instead, so the centroid never divides by zero.
pub async fn build_map(
    locations: &[PropertyLocation],
    city: &str,
    geocoder: &dyn Geocoder,
) -> PropertyMap {
    let center = match centroid(locations) {
        Some(c) => c,
        None => geocoder.resolve("", city).await,
    };

    let markers: Vec<Marker> = locations
        .iter()
        .filter(|loc| loc.is_resolved())
        .map(|loc| Marker {
            name: loc.property_name.clone(),
            price: loc.price.clone(),
            address: loc.address.clone(),
            url: loc.url.clone(),
            latitude: loc.latitude,
            longitude: loc.longitude,
        })
        .collect();

    if markers.is_empty() && !locations.is_empty() {
        warn!("none of the {} properties could be placed on the map", locations.len());
    }

    PropertyMap { center, zoom: DEFAULT_ZOOM, markers }
}

/// Mean of the resolved coordinates, or `None` when there are none.
fn centroid(locations: &[PropertyLocation]) -> Option<(f64, f64)> {
    let valid: Vec<(f64, f64)> = locations
        .iter()
        .filter(|loc| loc.is_resolved())
        .map(|loc| (loc.latitude, loc.longitude))
        .collect();

    if valid.is_empty() {
        return None;
    }

    let n = valid.len() as f64;
    let lat_sum: f64 = valid.iter().map(|(lat, _)| lat).sum();
    let lon_sum: f64 = valid.iter().map(|(_, lon)| lon).sum();
    Some((lat_sum / n, lon_sum / n))
}

impl PropertyMap {
    /// Render a standalone Leaflet document with one popup marker per
    /// resolved listing.
    pub fn to_html(&self) -> String {
        let markers_json = serde_json::to_string(
            &self
                .markers
                .iter()
                .map(|m| {
                    json!({
                        "name": m.name,
                        "price": m.price,
                        "address": m.address,
                        "url": m.url.clone().unwrap_or_default(),
                        "lat": m.latitude,
                        "lon": m.longitude,
                    })
                })
                .collect::<Vec<_>>(),
        )
        .unwrap_or_else(|_| "[]".to_string());

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Plot Map</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html,body,#map{{height:100%;margin:0}}</style>
</head>
<body>
<div id="map"></div>
<script>
var map = L.map('map').setView([{lat}, {lon}], {zoom});
L.tileLayer('https://tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
  maxZoom: 19,
  attribution: '&copy; OpenStreetMap contributors'
}}).addTo(map);
var markers = {markers_json};
markers.forEach(function (m) {{
  var popup = '<div style="width:250px">'
    + '<h4>' + m.name + '</h4>'
    + '<p><b>Price:</b> ' + m.price + '</p>'
    + '<p><b>Address:</b> ' + m.address + '</p>'
    + (m.url ? '<p><a href="' + m.url + '" target="_blank">View Property</a></p>' : '')
    + '</div>';
  L.marker([m.lat, m.lon])
    .bindPopup(popup, {{ maxWidth: 300 }})
    .bindTooltip(m.name + ' - ' + m.price)
    .addTo(map);
}});
</script>
</body>
</html>
"#,
            lat = self.center.0,
            lon = self.center.1,
            zoom = self.zoom,
        )
    }

    pub fn write_html(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_html())
            .with_context(|| format!("failed to write map to {}", path.display()))
    }
}

// ── Tests ──
