//! The single place raw LLM output becomes a typed value.
//!
//! The analysis prompt asks for HTML listing cards, then a literal marker
//! line, then prose. The model is not guaranteed to obey: a missing marker
//! means "no structured cards" and the whole response is treated as prose.

use regex::Regex;

/// Literal separator the analysis prompt instructs the model to emit
/// between the card markup and the prose sections.
pub const SECTION_MARKER: &str = "---ANALYSIS_SECTION_BELOW---";

/// Split result for one property-analysis response.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyReport {
    /// Raw card markup preceding the marker; empty when the marker is absent.
    pub cards_html: String,
    /// Prose analysis (the full response when the marker is absent).
    pub analysis: String,
}

/// Split an analysis response on the first occurrence of the marker.
pub fn split_report(text: &str) -> PropertyReport {
    match text.split_once(SECTION_MARKER) {
        Some((cards, analysis)) => PropertyReport {
            cards_html: strip_code_fences(cards).trim().to_string(),
            analysis: analysis.trim().to_string(),
        },
        None => PropertyReport {
            cards_html: String::new(),
            analysis: text.trim().to_string(),
        },
    }
}

/// Remove markdown code fences some models wrap the card block in despite
/// instructions. Only the fence lines go; the HTML between them stays.
fn strip_code_fences(s: &str) -> String {
    let re = Regex::new(r"(?m)^```[a-zA-Z]*[ \t]*$\n?").unwrap();
    re.replace_all(s, "").to_string()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_present_splits_cards_from_prose() {
        let text = format!(
            "<div class=\"property-card\">A</div>\n{SECTION_MARKER}\n💰 PLOT VALUE ANALYSIS\n• cheap"
        );
        let report = split_report(&text);
        assert_eq!(report.cards_html, "<div class=\"property-card\">A</div>");
        assert!(report.analysis.starts_with("💰 PLOT VALUE ANALYSIS"));
    }

    #[test]
    fn marker_absent_means_all_prose() {
        let report = split_report("No plots matched your criteria.");
        assert_eq!(report.cards_html, "");
        assert_eq!(report.analysis, "No plots matched your criteria.");
    }

    #[test]
    fn split_is_on_first_marker_only() {
        let text = format!("cards\n{SECTION_MARKER}\nprose\n{SECTION_MARKER}\nmore");
        let report = split_report(&text);
        assert_eq!(report.cards_html, "cards");
        assert!(report.analysis.contains(SECTION_MARKER));
    }

    #[test]
    fn code_fences_around_cards_are_stripped() {
        let text = format!(
            "```html\n<div class=\"property-card\">A</div>\n```\n{SECTION_MARKER}\nprose"
        );
        let report = split_report(&text);
        assert_eq!(report.cards_html, "<div class=\"property-card\">A</div>");
    }

    #[test]
    fn empty_response_yields_empty_report() {
        let report = split_report("");
        assert_eq!(report.cards_html, "");
        assert_eq!(report.analysis, "");
    }
}
