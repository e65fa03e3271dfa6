//! Free-text address resolution via a Nominatim-style search endpoint.
//!
//! This client never fails past its own boundary: zero results fall back to
//! a city-level query, and any transport or parse error degrades to the
//! `(0.0, 0.0)` sentinel the rest of the pipeline knows how to skip.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::GEOCODE_USER_AGENT;

/// The "no valid geocode obtained" sentinel.
pub const UNRESOLVED: (f64, f64) = (0.0, 0.0);

/// Seam for address resolution so the pipeline and map renderer can be
/// exercised without the network.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &str, city: &str) -> (f64, f64);
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

pub struct NominatimClient {
    client: Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// One search query. `Ok(None)` means the service answered with zero
    /// results; `Err` means transport or parse trouble.
    async fn query(&self, q: &str) -> Result<Option<(f64, f64)>> {
        let places: Vec<Place> = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", q), ("format", "json"), ("limit", "1")])
            .header("User-Agent", GEOCODE_USER_AGENT)
            .send()
            .await?
            .json()
            .await?;

        match places.first() {
            Some(p) => {
                let lat = p.lat.parse::<f64>()?;
                let lon = p.lon.parse::<f64>()?;
                Ok(Some((lat, lon)))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn resolve(&self, address: &str, city: &str) -> (f64, f64) {
        let full_address = format!("{address}, {city}");

        match self.query(&full_address).await {
            Ok(Some(coords)) => coords,
            Ok(None) => {
                // Address not found; try the city alone.
                debug!(%full_address, "no geocode hit, falling back to city");
                match self.query(city).await {
                    Ok(Some(coords)) => coords,
                    Ok(None) => UNRESOLVED,
                    Err(e) => {
                        warn!("city-level geocoding failed: {e:#}");
                        UNRESOLVED
                    }
                }
            }
            Err(e) => {
                warn!(%full_address, "geocoding failed: {e:#}");
                UNRESOLVED
            }
        }
    }
}

/// Minimum-interval gate between geocoding calls. Waits before every call
/// except the first, so N calls incur exactly N-1 waits.
pub struct Pacer {
    interval: Duration,
    waits: usize,
    first: bool,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, waits: 0, first: true }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub async fn pace(&mut self) {
        if self.first {
            self.first = false;
            return;
        }
        self.waits += 1;
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Number of waits incurred so far.
    pub fn waits(&self) -> usize {
        self.waits
    }
}

// ── Tests ──
