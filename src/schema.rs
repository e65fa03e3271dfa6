use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

/// One raw listing as returned by the extraction service.
///
/// Field aliases match the upstream payload, which capitalizes some keys.
/// Records are treated as immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRecord {
    #[serde(alias = "Building_name", default)]
    pub building_name: String,
    #[serde(alias = "Property_type", default)]
    pub property_type: String,
    #[serde(default)]
    pub location_address: String,
    #[serde(alias = "Price", default)]
    pub price: String,
    #[serde(alias = "Description", default)]
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub area_sqft: Option<f64>,
    #[serde(default)]
    pub dimensions: Option<String>,
    #[serde(default)]
    pub approved_for_construction: Option<bool>,
}

/// Price-trend datum for one locality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub price_per_sqft: f64,
    #[serde(default)]
    pub percent_increase: f64,
    #[serde(default)]
    pub rental_yield: f64,
}

/// A listing joined to its geocoded position.
///
/// `(0.0, 0.0)` is the "unresolved" sentinel: such a location is excluded
/// from centroid computation and marker rendering. A genuine coordinate at
/// the origin is indistinguishable from failure; known limitation carried
/// over from the geocoding contract.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyLocation {
    pub property_id: String,
    pub property_name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub price: String,
    pub url: Option<String>,
}

impl PropertyLocation {
    pub fn is_resolved(&self) -> bool {
        !(self.latitude == 0.0 && self.longitude == 0.0)
    }
}

/// Result wrapper from the extraction service. Opaque except for the
/// success flag and the nested record list under `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "expiresAt", default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ExtractionEnvelope {
    /// Pull the record list stored under `data.<key>`. Returns `None` on a
    /// non-success envelope or any payload shape mismatch; the caller decides
    /// what the degraded value is.
    pub fn records<T: DeserializeOwned>(&self, key: &str) -> Option<Vec<T>> {
        if !self.success {
            return None;
        }
        let list = self.data.get(key)?.clone();
        serde_json::from_value(list).ok()
    }
}

/// Structured-output schema sent alongside the property extraction prompt.
/// Mirrors the shape the service expects: one object with a single array
/// property holding the record objects.
pub fn properties_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "properties": {
                "type": "array",
                "description": "List of property details",
                "items": {
                    "type": "object",
                    "properties": {
                        "building_name": { "type": "string", "description": "Name of the building/property" },
                        "property_type": { "type": "string", "description": "Type of property (commercial, residential, etc)" },
                        "location_address": { "type": "string", "description": "Complete address of the property" },
                        "price": { "type": "string", "description": "Price of the property" },
                        "description": { "type": "string", "description": "Detailed description of the property" },
                        "url": { "type": "string", "description": "URL of the property listing" },
                        "area_sqft": { "type": "number", "description": "Area of the plot in square feet" },
                        "dimensions": { "type": "string", "description": "Dimensions of the plot (length x width)" },
                        "approved_for_construction": { "type": "boolean", "description": "Whether the plot is approved for construction" }
                    },
                    "required": ["building_name", "property_type", "location_address", "price", "description"]
                }
            }
        },
        "required": ["properties"]
    })
}

/// Schema for the locality price-trend extraction.
pub fn locations_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "locations": {
                "type": "array",
                "description": "List of location data points",
                "items": {
                    "type": "object",
                    "properties": {
                        "location": { "type": "string" },
                        "price_per_sqft": { "type": "number" },
                        "percent_increase": { "type": "number" },
                        "rental_yield": { "type": "number" }
                    },
                    "required": ["location", "price_per_sqft", "percent_increase", "rental_yield"]
                }
            }
        },
        "required": ["locations"]
    })
}

// ── Tests ──
