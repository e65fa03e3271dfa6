use anyhow::{bail, Result};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const FIRECRAWL_BASE_URL: &str = "https://api.firecrawl.dev/v1";
pub const GEOCODE_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Minimum interval between geocoding requests (milliseconds). The public
/// geocoding service asks for at most one request per second.
pub const DEFAULT_GEOCODE_INTERVAL_MS: u64 = 1000;

/// Identification header sent with every geocoding request, per the
/// service's usage policy.
pub const GEOCODE_USER_AGENT: &str = concat!("plot-scout/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct Config {
    pub firecrawl_api_key: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub firecrawl_base_url: String,
    pub geocode_base_url: String,
    /// Pacing interval for the geocoder (GEOCODE_INTERVAL_MS).
    pub geocode_interval_ms: u64,
}

impl Config {
    /// Read configuration from the environment. Both API keys are required;
    /// a missing key is reported here, before any network call is made.
    pub fn from_env() -> Result<Self> {
        let firecrawl_api_key = std::env::var("FIRECRAWL_API_KEY").unwrap_or_default();
        let openai_api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();

        let mut missing = Vec::new();
        if firecrawl_api_key.is_empty() {
            missing.push("FIRECRAWL_API_KEY");
        }
        if openai_api_key.is_empty() {
            missing.push("OPENAI_API_KEY");
        }
        if !missing.is_empty() {
            bail!(
                "missing required environment variable(s): {}. Set them before running.",
                missing.join(", ")
            );
        }

        Ok(Self {
            firecrawl_api_key,
            openai_api_key,
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| OPENAI_BASE_URL.to_string()),
            firecrawl_base_url: std::env::var("FIRECRAWL_BASE_URL")
                .unwrap_or_else(|_| FIRECRAWL_BASE_URL.to_string()),
            geocode_base_url: std::env::var("GEOCODE_BASE_URL")
                .unwrap_or_else(|_| GEOCODE_BASE_URL.to_string()),
            geocode_interval_ms: std::env::var("GEOCODE_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_GEOCODE_INTERVAL_MS),
        })
    }
}

// ── Tests ──
