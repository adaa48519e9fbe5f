//! Keyword filtering over artist and event title.

use super::Filter;
use crate::parsing::text::strip_accents;
use crate::ticketera::EventSummary;

/// Filters events by terms in the artist or title, ignoring case and accents.
pub struct KeywordFilter {
    /// Terms that must all appear.
    required: Vec<String>,
    /// Terms that must NOT appear.
    excluded: Vec<String>,
}

fn fold(text: &str) -> String {
    strip_accents(text).to_lowercase()
}

impl KeywordFilter {
    pub fn new(required: Vec<String>, excluded: Vec<String>) -> Self {
        Self {
            required: required.iter().map(|k| fold(k)).collect(),
            excluded: excluded.iter().map(|k| fold(k)).collect(),
        }
    }

    /// Creates a filter with only required terms.
    pub fn required(keywords: Vec<String>) -> Self {
        Self::new(keywords, Vec::new())
    }

    /// Creates a filter with only excluded terms.
    pub fn excluded(keywords: Vec<String>) -> Self {
        Self::new(Vec::new(), keywords)
    }
}

impl Filter for KeywordFilter {
    fn matches(&self, event: &EventSummary) -> bool {
        let haystack = match &event.artist {
            Some(artist) => fold(&format!("{} {}", artist, event.name)),
            None => fold(&event.name),
        };

        self.required.iter().all(|k| haystack.contains(k.as_str()))
            && !self.excluded.iter().any(|k| haystack.contains(k.as_str()))
    }

    fn description(&self) -> String {
        let mut parts = Vec::new();

        if !self.required.is_empty() {
            parts.push(format!("Must contain: {}", self.required.join(", ")));
        }

        if !self.excluded.is_empty() {
            parts.push(format!("Must not contain: {}", self.excluded.join(", ")));
        }

        if parts.is_empty() {
            "Keywords: any".to_string()
        } else {
            parts.join("; ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_event(name: &str, artist: Option<&str>) -> EventSummary {
        let mut event = EventSummary::from_id("7");
        event.name = name.to_string();
        event.artist = artist.map(String::from);
        event
    }

    #[test]
    fn test_required_keywords() {
        let filter = KeywordFilter::required(vec!["fabulosos".to_string(), "cadillacs".to_string()]);

        assert!(filter.matches(&make_event("Los Fabulosos Cadillacs", None)));
        assert!(filter.matches(&make_event("LOS FABULOSOS CADILLACS - Gira", None)));
        assert!(!filter.matches(&make_event("Cadillacs tributo", None)));
    }

    #[test]
    fn test_excluded_keywords() {
        let filter = KeywordFilter::excluded(vec!["cancelado".to_string()]);

        assert!(filter.matches(&make_event("Los Jaivas", None)));
        assert!(!filter.matches(&make_event("Los Jaivas (CANCELADO)", None)));
    }

    #[test]
    fn test_accent_insensitive() {
        let filter = KeywordFilter::required(vec!["garcia".to_string()]);
        assert!(filter.matches(&make_event("Charly García", None)));

        let filter = KeywordFilter::required(vec!["Caupolicán".to_string()]);
        assert!(filter.matches(&make_event("Teatro Caupolican", None)));
    }

    #[test]
    fn test_matches_artist_field() {
        let filter = KeywordFilter::required(vec!["laferte".to_string()]);
        assert!(filter.matches(&make_event("Autopoiética Tour", Some("Mon Laferte"))));
        assert!(!filter.matches(&make_event("Autopoiética Tour", None)));
    }

    #[test]
    fn test_empty_keywords() {
        let filter = KeywordFilter::new(Vec::new(), Vec::new());
        assert!(filter.matches(&make_event("Anything", None)));
        assert_eq!(filter.description(), "Keywords: any");
    }

    #[test]
    fn test_description_both() {
        let filter = KeywordFilter::new(vec!["Ñandú".to_string()], vec!["suspendido".to_string()]);
        let desc = filter.description();
        assert!(desc.contains("Must contain: nandu"));
        assert!(desc.contains("Must not contain: suspendido"));
    }
}
