//! Client for the listing extraction service.
//!
//! One call per run submits all target listing-site URLs together with a
//! natural-language prompt and a structured-output schema. Failures of any
//! kind degrade to an empty result at this boundary; the pipeline decides
//! how to present that.

use anyhow::Result;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::schema::{
    locations_schema, properties_schema, ExtractionEnvelope, LocationRecord, PropertyRecord,
};

#[derive(Debug, Serialize)]
struct ExtractRequest {
    urls: Vec<String>,
    prompt: String,
    schema: Value,
}

/// Locality trend extraction keeps the asymmetric contract of the property
/// path: failure is an informational "no data" outcome, not an empty list.
#[derive(Debug, Clone)]
pub enum TrendExtraction {
    Records(Vec<LocationRecord>),
    Unavailable,
}

pub struct FirecrawlClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FirecrawlClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Extract plot listings for `city` under `max_price` crores.
    ///
    /// Returns the records plus the raw envelope (retained by the caller so
    /// later stages reuse the same payload instead of re-extracting). A
    /// non-success envelope, transport error, or malformed payload yields an
    /// empty record list and no envelope.
    pub async fn extract_properties(
        &self,
        city: &str,
        max_price: f64,
        property_category: &str,
    ) -> (Vec<PropertyRecord>, Option<ExtractionEnvelope>) {
        let urls = listing_urls(city);
        let prompt = property_prompt(city, max_price, property_category);

        info!(city, max_price, property_category, "extracting property listings");

        let envelope = match self.extract(urls, prompt, properties_schema()).await {
            Ok(env) => env,
            Err(e) => {
                warn!("property extraction failed: {e:#}");
                return (Vec::new(), None);
            }
        };

        let records = envelope
            .records::<PropertyRecord>("properties")
            .unwrap_or_else(|| {
                warn!(status = %envelope.status, "extraction envelope had no usable properties");
                Vec::new()
            });

        debug!("extracted {} property records", records.len());
        (records, Some(envelope))
    }

    /// Extract locality price trends for `city`.
    pub async fn extract_location_trends(&self, city: &str) -> TrendExtraction {
        let slug = city_slug(city);
        let urls = vec![
            format!("https://www.99acres.com/property-rates-and-price-trends-in-{slug}-prffid/*"),
            format!("https://housing.com/in/buy/plots/{slug}/{slug}"),
        ];
        let prompt = trends_prompt(city);

        info!(city, "extracting locality price trends");

        let envelope = match self.extract(urls, prompt, locations_schema()).await {
            Ok(env) => env,
            Err(e) => {
                warn!("trend extraction failed: {e:#}");
                return TrendExtraction::Unavailable;
            }
        };

        match envelope.records::<LocationRecord>("locations") {
            Some(records) => TrendExtraction::Records(records),
            None => {
                warn!(status = %envelope.status, "trend envelope had no usable locations");
                TrendExtraction::Unavailable
            }
        }
    }

    async fn extract(
        &self,
        urls: Vec<String>,
        prompt: String,
        schema: Value,
    ) -> Result<ExtractionEnvelope> {
        let request = ExtractRequest { urls, prompt, schema };

        let response = self
            .client
            .post(format!("{}/extract", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let envelope = response.json::<ExtractionEnvelope>().await?;
        Ok(envelope)
    }
}

fn city_slug(city: &str) -> String {
    city.trim().to_lowercase()
}

/// The four listing sites searched per run. Glob suffixes let the service
/// follow pagination under each pattern.
fn listing_urls(city: &str) -> Vec<String> {
    let slug = city_slug(city);
    vec![
        format!("https://www.squareyards.com/sale/plot-for-sale-in-{slug}/*"),
        format!("https://www.99acres.com/plots-in-{slug}-ffid/*"),
        format!("https://housing.com/in/buy/plots/{slug}/{slug}"),
        format!("https://www.magicbricks.com/property-for-sale/residential-plot/{slug}-all/*"),
    ]
}

fn property_prompt(city: &str, max_price: f64, property_category: &str) -> String {
    format!(
        "Extract ONLY 10 OR LESS different {property_category} Plots from {city} that cost less than {max_price} crores.

Requirements:
- Property Category: {property_category} plots only
- Property Type: Plot/Land only
- Location: {city}
- Maximum Price: {max_price} crores
- Include complete plot details with exact location
- IMPORTANT: Extract specific plot details including:
  - Plot area in square feet
  - Plot dimensions where available
  - Legal approvals status
  - GATED or OPEN plot
  - Connectivity details
  - Nearby landmarks and facilities
- IMPORTANT: Include the original property URL for each listing
- Return data for at least 5 different plots. MAXIMUM 10.
- Format as a list of plots with their respective details"
    )
}

fn trends_prompt(city: &str) -> String {
    format!(
        "Extract price trends data for ALL major localities in {city} SPECIFICALLY FOR PLOTS/LAND.

IMPORTANT:
- Focus on PLOT/LAND prices, not apartments or houses
- Return data for at least 5-10 different localities
- Include both premium and affordable areas
- Extract the following for each locality:
  * Current price per sq ft for plots
  * Year-on-year appreciation percentage
  * Future growth potential
  * Infrastructure development status
  * Connectivity details
- Format as a list of locations with their respective data"
    )
}

// ── Tests ──
