//! Narrative analysis over extracted records, via the chat client.
//!
//! Prompts embed the serialized records and pin down the output contract:
//! HTML cards, then the section marker, then prose under fixed headers.
//! Whether the model honors that contract is handled in `report`, not here.

use anyhow::Result;
use tracing::info;

use crate::llm::ChatClient;
use crate::report::SECTION_MARKER;
use crate::schema::{LocationRecord, PropertyLocation, PropertyRecord};

/// Shown instead of trend analysis when the trend extraction came back empty.
pub const NO_TRENDS_MESSAGE: &str = "No price trends data available for plots in this area";

/// Shown instead of area insights when no property was geocoded.
pub const NO_INSIGHTS_MESSAGE: &str = "No property location data available for analysis.";

pub struct AnalysisClient {
    chat: ChatClient,
}

impl AnalysisClient {
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }

    /// Select and format the best listings. Works over an empty record list;
    /// the model then reports that nothing matched.
    pub async fn summarize_properties(
        &self,
        records: &[PropertyRecord],
        property_category: &str,
        max_price: f64,
    ) -> Result<String> {
        info!(records = records.len(), model = self.chat.model(), "requesting property analysis");
        let prompt = property_analysis_prompt(records, property_category, max_price);
        self.chat.generate(&prompt).await
    }

    /// Locality trend narrative over the extracted trend records.
    pub async fn summarize_location_trends(
        &self,
        records: &[LocationRecord],
        city: &str,
    ) -> Result<String> {
        info!(records = records.len(), city, "requesting trend analysis");
        let prompt = trends_analysis_prompt(records, city);
        self.chat.generate(&prompt).await
    }

    /// Geographic-distribution insights over the geocoded locations.
    pub async fn summarize_area_distribution(
        &self,
        locations: &[PropertyLocation],
        city: &str,
    ) -> Result<String> {
        if locations.is_empty() {
            return Ok(NO_INSIGHTS_MESSAGE.to_string());
        }
        info!(locations = locations.len(), city, "requesting area insights");
        let prompt = area_insights_prompt(locations, city);
        self.chat.generate(&prompt).await
    }
}

fn property_analysis_prompt(
    records: &[PropertyRecord],
    property_category: &str,
    max_price: f64,
) -> String {
    let records_json =
        serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"As a real estate expert, analyze these plots and market trends:

Properties Found in json format:
{records_json}

**IMPORTANT INSTRUCTIONS:**
1. ONLY analyze plots from the above JSON data that match the user's requirements:
   - Property Category: {property_category}
   - Maximum Price: {max_price} crores
2. From the matching plots, select the 5 best plots

Please provide your analysis in this format:

First, create a wrapper div with class="card-container" and inside it, create 5 HTML divs (one for each plot) with class="property-card" using this structure:

<div class="card-container">
  <div class="property-card">
    <h3>PLOT_NAME</h3>
    <div class="property-price">₹PRICE</div>
    <div class="property-address">LOCATION</div>
    <div class="property-features">
      <p><strong>Area:</strong> AREA_SQFT sq.ft</p>
      <p><strong>Dimensions:</strong> DIMENSIONS</p>
    </div>
    <div class="property-description">BRIEF_DESCRIPTION (up to 100 words)</div>
    <a href="PROPERTY_URL" class="property-cta" target="_blank">View Details</a>
  </div>
  <!-- Repeat for all 5 properties -->
</div>

DO NOT wrap this HTML in triple backticks or markdown code blocks.
Make sure you replace PROPERTY_URL with the actual URL from the property data.
The "View Details" button must be an actual <a> link tag, not just a div.

Then, AFTER the card container div, start a new section with "{SECTION_MARKER}" followed by your analysis text.

Your analysis should include:

💰 PLOT VALUE ANALYSIS
• Compare the selected plots based on:
  - Price per sq ft
  - Location advantage
  - Development potential
  - Legal clearances
  - Future appreciation potential

📍 LOCATION INSIGHTS FOR PLOT INVESTMENT
• Specific advantages of investing in plots in these areas
• Infrastructure development plans
• Growth trajectory of the area

💡 INVESTMENT RECOMMENDATIONS
• Top 3 plots from the selection with reasoning
• Expected ROI timeline
• Development possibilities
• Points to consider before purchase

🤝 NEGOTIATION TIPS FOR PLOT PURCHASES
• Plot-specific negotiation strategies
• Documentation verification checklist
• Legal considerations specific to land purchases

Remember: First provide the HTML card container with all cards inside (without code blocks), then the text analysis AFTER the marker."#
    )
}

fn trends_analysis_prompt(records: &[LocationRecord], city: &str) -> String {
    let records_json =
        serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"As a real estate expert specializing in plot investments, analyze these location price trends for {city}:

{records_json}

Please provide:
1. A bullet-point analysis of plot price trends for each location with focus on:
   - Current price per sq ft
   - Historical appreciation rates
   - Future growth potential

2. Identify the top 3 locations for plot investments with:
   - Highest price appreciation potential
   - Best infrastructure development plans
   - Best connectivity and amenities
   - Most favorable regulations for plot development

3. Plot investment recommendations:
   - Best locations for long-term land banking
   - Best locations for immediate development
   - Areas showing emerging potential for plot investments
   - Risk factors to consider in different areas

4. Specific advice for plot investors based on these trends

Format the response as follows:

📊 PLOT PRICE TRENDS BY LOCATION
• [Analysis for each location]

🏆 TOP PLOT INVESTMENT AREAS
• [Analysis of best areas for plots]

💡 PLOT INVESTMENT STRATEGIES
• [Strategic advice for different plot investment approaches]

🚧 DEVELOPMENT POTENTIAL ANALYSIS
• [Analysis of which areas have best development prospects]

🎯 RECOMMENDATIONS FOR PLOT BUYERS
• [Specific advice for plot purchase decisions]"#
    )
}

fn area_insights_prompt(locations: &[PropertyLocation], city: &str) -> String {
    let locations_json = serde_json::to_string(locations).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"As a geolocation and real estate expert, analyze the geographic distribution of these plots in {city}:

{locations_json}

Please provide:

1. GEOGRAPHIC DISTRIBUTION ANALYSIS
   - Analyze how the properties are distributed across the city
   - Identify clusters or patterns in the locations
   - Comment on the relationship between location and price

2. PROXIMITY ANALYSIS
   - For each property, identify nearby amenities or landmarks
   - Analyze accessibility to major roads, public transport
   - Evaluate the overall connectivity score for each location

3. DEVELOPMENT TRAJECTORY
   - Based on the locations, predict future development directions in the city
   - Identify emerging areas versus established locations
   - Suggest which areas show highest development potential

Format your response in a clear, structured way using bullet points and sections."#
    )
}

// ── Tests ──
