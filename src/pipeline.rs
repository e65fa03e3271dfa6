//! Run coordination: extraction → analysis → geocoding → mapping → trends.
//!
//! One `RunContext` is built per user-triggered run and dropped at the end;
//! there is no cross-run state. Each stage sits behind a catch-and-report
//! boundary: a failing stage marks the run `Failed` with the causing stage
//! and message, but everything earlier stages produced stays in the outcome.
//! Nothing is retried automatically; re-running the command is the retry.

use std::fmt;
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::analysis::{AnalysisClient, NO_TRENDS_MESSAGE};
use crate::config::Config;
use crate::extract::{FirecrawlClient, TrendExtraction};
use crate::geocode::{Geocoder, NominatimClient, Pacer};
use crate::llm::ChatClient;
use crate::map::{build_map, PropertyMap};
use crate::report::{split_report, PropertyReport};
use crate::schema::{ExtractionEnvelope, PropertyLocation, PropertyRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Extracting,
    Analyzing,
    Geocoding,
    Mapping,
    TrendAnalyzing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::Extracting => "extracting listings",
            Stage::Analyzing => "analyzing listings",
            Stage::Geocoding => "geocoding",
            Stage::Mapping => "rendering map",
            Stage::TrendAnalyzing => "analyzing trends",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
}

/// Everything a run produced, kept even when a later stage failed.
pub struct RunOutcome {
    pub stage: Stage,
    pub failure: Option<StageFailure>,
    pub extracted: Vec<PropertyRecord>,
    /// Raw envelope of the property extraction, retained so later stages
    /// reuse the decoded payload instead of re-calling the service.
    pub envelope: Option<ExtractionEnvelope>,
    pub report: Option<PropertyReport>,
    pub locations: Vec<PropertyLocation>,
    pub map: Option<PropertyMap>,
    pub trend_analysis: Option<String>,
    pub area_insights: Option<String>,
}

impl RunOutcome {
    fn new() -> Self {
        Self {
            stage: Stage::Idle,
            failure: None,
            extracted: Vec::new(),
            envelope: None,
            report: None,
            locations: Vec::new(),
            map: None,
            trend_analysis: None,
            area_insights: None,
        }
    }

    fn fail(&mut self, stage: Stage, err: anyhow::Error) {
        // Report the full chain; the run keeps whatever it already produced.
        self.failure = Some(StageFailure { stage, message: format!("{err:?}") });
    }
}

#[derive(Debug, Clone)]
pub struct RunParams {
    pub city: String,
    pub max_price: f64,
    pub property_category: String,
    pub model: String,
    pub map_out: PathBuf,
}

/// Per-run bundle of service clients and parameters.
pub struct RunContext {
    firecrawl: FirecrawlClient,
    analysis: AnalysisClient,
    geocoder: Box<dyn Geocoder>,
    geocode_interval_ms: u64,
    params: RunParams,
}

impl RunContext {
    pub fn new(config: &Config, params: RunParams) -> Self {
        let firecrawl = FirecrawlClient::new(&config.firecrawl_base_url, &config.firecrawl_api_key);
        let chat = ChatClient::new(&config.openai_base_url, &config.openai_api_key, &params.model);
        let geocoder = Box::new(NominatimClient::new(&config.geocode_base_url));
        Self {
            firecrawl,
            analysis: AnalysisClient::new(chat),
            geocoder,
            geocode_interval_ms: config.geocode_interval_ms,
            params,
        }
    }

    /// Swap the geocoder seam (tests use a stub here).
    #[cfg(test)]
    fn with_geocoder(mut self, geocoder: Box<dyn Geocoder>) -> Self {
        self.geocoder = geocoder;
        self
    }

    /// Full pipeline for one run.
    pub async fn run(self) -> RunOutcome {
        let mut outcome = self.find(RunOutcome::new()).await;
        if outcome.failure.is_some() {
            return outcome;
        }

        // Geocoding never fails past the client boundary; unresolved
        // addresses carry the sentinel.
        outcome.stage = Stage::Geocoding;
        outcome.locations = geocode_properties(
            &outcome.extracted,
            &self.params.city,
            self.geocoder.as_ref(),
            &mut Pacer::from_millis(self.geocode_interval_ms),
        )
        .await;

        outcome.stage = Stage::Mapping;
        let map = build_map(&outcome.locations, &self.params.city, self.geocoder.as_ref()).await;
        let write_result = map.write_html(&self.params.map_out);
        outcome.map = Some(map);
        if let Err(e) = write_result {
            outcome.fail(Stage::Mapping, e);
            return outcome;
        }
        info!(path = %self.params.map_out.display(), "map written");

        outcome.stage = Stage::TrendAnalyzing;
        match self.trends_text().await {
            Ok(text) => outcome.trend_analysis = Some(text),
            Err(e) => {
                outcome.fail(Stage::TrendAnalyzing, e);
                return outcome;
            }
        }
        match self
            .analysis
            .summarize_area_distribution(&outcome.locations, &self.params.city)
            .await
        {
            Ok(text) => outcome.area_insights = Some(text),
            Err(e) => {
                outcome.fail(Stage::TrendAnalyzing, e);
                return outcome;
            }
        }

        outcome.stage = Stage::Done;
        outcome
    }

    /// Extraction + listing analysis only (the `find` command).
    pub async fn run_find(self) -> RunOutcome {
        let mut outcome = self.find(RunOutcome::new()).await;
        if outcome.failure.is_none() {
            outcome.stage = Stage::Done;
        }
        outcome
    }

    /// Locality trend analysis only (the `trends` command).
    pub async fn run_trends(self) -> RunOutcome {
        let mut outcome = RunOutcome::new();
        outcome.stage = Stage::TrendAnalyzing;
        match self.trends_text().await {
            Ok(text) => {
                outcome.trend_analysis = Some(text);
                outcome.stage = Stage::Done;
            }
            Err(e) => outcome.fail(Stage::TrendAnalyzing, e),
        }
        outcome
    }

    async fn find(&self, mut outcome: RunOutcome) -> RunOutcome {
        outcome.stage = Stage::Extracting;
        let (records, envelope) = self
            .firecrawl
            .extract_properties(
                &self.params.city,
                self.params.max_price,
                &self.params.property_category,
            )
            .await;
        outcome.extracted = records;
        outcome.envelope = envelope;

        outcome.stage = Stage::Analyzing;
        match self
            .analysis
            .summarize_properties(
                &outcome.extracted,
                &self.params.property_category,
                self.params.max_price,
            )
            .await
        {
            Ok(text) => outcome.report = Some(split_report(&text)),
            Err(e) => outcome.fail(Stage::Analyzing, e),
        }
        outcome
    }

    /// Trend extraction keeps its asymmetric contract: unavailable data is
    /// an informational message, not a failure.
    async fn trends_text(&self) -> anyhow::Result<String> {
        match self.firecrawl.extract_location_trends(&self.params.city).await {
            TrendExtraction::Records(records) => {
                self.analysis
                    .summarize_location_trends(&records, &self.params.city)
                    .await
            }
            TrendExtraction::Unavailable => Ok(NO_TRENDS_MESSAGE.to_string()),
        }
    }
}

/// Geocode each record in input order, synthesizing sequential ids. Pacing
/// is whatever policy the caller hands in; the geocoder itself never fails,
/// so unresolved addresses come back as sentinel locations.
pub async fn geocode_properties(
    records: &[PropertyRecord],
    city: &str,
    geocoder: &dyn Geocoder,
    pacer: &mut Pacer,
) -> Vec<PropertyLocation> {
    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} geocoding [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut locations = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        pacer.pace().await;

        let (lat, lon) = geocoder.resolve(&record.location_address, city).await;

        let property_name = if record.building_name.is_empty() {
            format!("Plot {}", idx + 1)
        } else {
            record.building_name.clone()
        };
        let price = if record.price.is_empty() {
            "Price not available".to_string()
        } else {
            record.price.clone()
        };

        locations.push(PropertyLocation {
            property_id: format!("prop_{idx}"),
            property_name,
            address: record.location_address.clone(),
            latitude: lat,
            longitude: lon,
            price,
            url: record.url.clone(),
        });
        pb.inc(1);
    }

    pb.finish_and_clear();
    locations
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Resolves "A, ..." to (10, 20); everything else is unresolved.
    struct StubGeocoder {
        calls: AtomicUsize,
    }

    impl StubGeocoder {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn resolve(&self, address: &str, _city: &str) -> (f64, f64) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if address.starts_with('A') {
                (10.0, 20.0)
            } else {
                (0.0, 0.0)
            }
        }
    }

    fn record(name: &str, address: &str) -> PropertyRecord {
        PropertyRecord {
            building_name: name.to_string(),
            property_type: "Residential".into(),
            location_address: address.to_string(),
            price: "1 crore".into(),
            description: "".into(),
            url: None,
            area_sqft: None,
            dimensions: None,
            approved_for_construction: None,
        }
    }

    #[tokio::test]
    async fn geocoding_preserves_order_and_synthesizes_ids() {
        let records = vec![record("First", "A Street"), record("Second", "B Street")];
        let geocoder = StubGeocoder::new();
        let mut pacer = Pacer::new(Duration::ZERO);

        let locations = geocode_properties(&records, "CityX", &geocoder, &mut pacer).await;

        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].property_id, "prop_0");
        assert_eq!(locations[0].property_name, "First");
        assert_eq!((locations[0].latitude, locations[0].longitude), (10.0, 20.0));
        assert_eq!(locations[1].property_id, "prop_1");
        assert!(!locations[1].is_resolved());
    }

    #[tokio::test]
    async fn n_geocode_calls_incur_n_minus_one_waits() {
        let records = vec![
            record("a", "A1"),
            record("b", "A2"),
            record("c", "A3"),
            record("d", "A4"),
        ];
        let geocoder = StubGeocoder::new();
        let mut pacer = Pacer::new(Duration::ZERO);

        geocode_properties(&records, "CityX", &geocoder, &mut pacer).await;

        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 4);
        assert_eq!(pacer.waits(), 3);
    }

    #[tokio::test]
    async fn missing_name_and_price_get_placeholders() {
        let mut r = record("", "A Street");
        r.price = String::new();
        let geocoder = StubGeocoder::new();
        let mut pacer = Pacer::new(Duration::ZERO);

        let locations = geocode_properties(&[r], "CityX", &geocoder, &mut pacer).await;
        assert_eq!(locations[0].property_name, "Plot 1");
        assert_eq!(locations[0].price, "Price not available");
    }

    fn test_config(firecrawl_url: &str, openai_url: &str) -> Config {
        Config {
            firecrawl_api_key: "fc-test".into(),
            openai_api_key: "sk-test".into(),
            openai_base_url: openai_url.into(),
            firecrawl_base_url: firecrawl_url.into(),
            geocode_base_url: "http://unused".into(),
            geocode_interval_ms: 0,
        }
    }

    fn test_params(map_out: PathBuf) -> RunParams {
        RunParams {
            city: "Pune".into(),
            max_price: 5.0,
            property_category: "Residential".into(),
            model: "o3-mini".into(),
            map_out,
        }
    }

    async fn mount_extract_success(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/extract"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {
                    "properties": [{
                        "building_name": "Sunrise Plots",
                        "property_type": "Residential",
                        "location_address": "A Street, Pune",
                        "price": "1.8 crores",
                        "description": "Gated layout"
                    }]
                },
                "status": "completed"
            })))
            .mount(server)
            .await;
    }

    fn chat_response(content: &str) -> serde_json::Value {
        json!({
            "id": "cc-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
    }

    #[tokio::test]
    async fn failed_analysis_keeps_extracted_records() {
        let firecrawl = MockServer::start().await;
        let openai = MockServer::start().await;
        mount_extract_success(&firecrawl).await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": { "message": "overloaded" }
            })))
            .mount(&openai)
            .await;

        let dir = std::env::temp_dir().join("plot_scout_test_fail");
        let ctx = RunContext::new(
            &test_config(&firecrawl.uri(), &openai.uri()),
            test_params(dir.join("map.html")),
        )
        .with_geocoder(Box::new(StubGeocoder::new()));

        let outcome = ctx.run().await;
        let failure = outcome.failure.expect("run should have failed");
        assert_eq!(failure.stage, Stage::Analyzing);
        assert!(failure.message.contains("overloaded"));
        // Output from the completed extraction stage survives the failure.
        assert_eq!(outcome.extracted.len(), 1);
        assert!(outcome.report.is_none());
    }

    #[tokio::test]
    async fn full_run_reaches_done_with_partial_card_fallback() {
        let firecrawl = MockServer::start().await;
        let openai = MockServer::start().await;
        mount_extract_success(&firecrawl).await;
        // Model ignores the marker contract entirely: the split must treat
        // the whole response as prose.
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("plain prose")))
            .mount(&openai)
            .await;

        let dir = std::env::temp_dir().join("plot_scout_test_done");
        std::fs::create_dir_all(&dir).unwrap();
        let ctx = RunContext::new(
            &test_config(&firecrawl.uri(), &openai.uri()),
            test_params(dir.join("map.html")),
        )
        .with_geocoder(Box::new(StubGeocoder::new()));

        let outcome = ctx.run().await;
        assert!(outcome.failure.is_none(), "{:?}", outcome.failure);
        assert_eq!(outcome.stage, Stage::Done);

        let report = outcome.report.unwrap();
        assert_eq!(report.cards_html, "");
        assert_eq!(report.analysis, "plain prose");

        assert_eq!(outcome.locations.len(), 1);
        assert_eq!(outcome.map.as_ref().unwrap().markers.len(), 1);
        // The shared extract mock has no locations payload, so the trend
        // path degrades to the informational message.
        assert_eq!(outcome.trend_analysis.as_deref(), Some(NO_TRENDS_MESSAGE));
        assert_eq!(outcome.area_insights.as_deref(), Some("plain prose"));
        assert!(dir.join("map.html").exists());
    }

    #[tokio::test]
    async fn empty_extraction_still_reaches_analysis() {
        let firecrawl = MockServer::start().await;
        let openai = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/extract"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false, "data": {}, "status": "failed"
            })))
            .mount(&firecrawl)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_response("nothing matched")),
            )
            .mount(&openai)
            .await;

        let ctx = RunContext::new(
            &test_config(&firecrawl.uri(), &openai.uri()),
            test_params(std::env::temp_dir().join("unused_map.html")),
        );

        let outcome = ctx.run_find().await;
        assert!(outcome.failure.is_none());
        assert!(outcome.extracted.is_empty());
        assert_eq!(outcome.report.unwrap().analysis, "nothing matched");
    }

    #[tokio::test]
    async fn unavailable_trends_produce_no_data_message_without_llm_call() {
        let firecrawl = MockServer::start().await;
        let openai = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/extract"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false, "data": {}, "status": "failed"
            })))
            .mount(&firecrawl)
            .await;

        let ctx = RunContext::new(
            &test_config(&firecrawl.uri(), &openai.uri()),
            test_params(std::env::temp_dir().join("unused_map.html")),
        );

        let outcome = ctx.run_trends().await;
        assert!(outcome.failure.is_none());
        assert_eq!(outcome.trend_analysis.as_deref(), Some(NO_TRENDS_MESSAGE));
    }
}
