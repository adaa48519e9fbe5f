//! Event selection with composable filters.

pub mod date;
pub mod keyword;
pub mod venue;

use crate::ticketera::EventSummary;
use chrono::NaiveDate;

pub use date::DateFilter;
pub use keyword::KeywordFilter;
pub use venue::VenueFilter;

/// Trait for filtering events.
pub trait Filter: Send + Sync {
    /// Returns true if the event passes the filter.
    fn matches(&self, event: &EventSummary) -> bool;

    /// Returns a description of this filter.
    fn description(&self) -> String;
}

/// A chain of filters that must all pass.
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    /// Creates an empty filter chain.
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    /// Adds a filter to the chain.
    pub fn add(&mut self, filter: impl Filter + 'static) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Checks if an event passes all filters.
    pub fn matches(&self, event: &EventSummary) -> bool {
        self.filters.iter().all(|f| f.matches(event))
    }

    /// Filters a list of events.
    pub fn apply(&self, events: Vec<EventSummary>) -> Vec<EventSummary> {
        events.into_iter().filter(|e| self.matches(e)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns descriptions of all filters.
    pub fn descriptions(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.description()).collect()
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing a FilterChain from CLI options.
pub struct FilterChainBuilder {
    chain: FilterChain,
}

impl FilterChainBuilder {
    pub fn new() -> Self {
        Self { chain: FilterChain::new() }
    }

    /// Adds required artist/title terms.
    pub fn keywords(mut self, keywords: Vec<String>) -> Self {
        if !keywords.is_empty() {
            self.chain.add(KeywordFilter::required(keywords));
        }
        self
    }

    /// Adds excluded artist/title terms.
    pub fn exclude_keywords(mut self, keywords: Vec<String>) -> Self {
        if !keywords.is_empty() {
            self.chain.add(KeywordFilter::excluded(keywords));
        }
        self
    }

    /// Adds a show date window.
    pub fn date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        if from.is_some() || to.is_some() {
            self.chain.add(DateFilter::new(from, to));
        }
        self
    }

    /// Adds a venue name filter.
    pub fn venue(mut self, venue: Option<String>) -> Self {
        if let Some(venue) = venue.filter(|v| !v.trim().is_empty()) {
            self.chain.add(VenueFilter::new(venue));
        }
        self
    }

    pub fn build(self) -> FilterChain {
        self.chain
    }
}

impl Default for FilterChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_event(name: &str, venue: Option<&str>, date: Option<NaiveDate>) -> EventSummary {
        let mut event = EventSummary::from_id("1");
        event.name = name.to_string();
        event.venue = venue.map(String::from);
        event.date = date;
        event
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn test_filter_chain_new() {
        let chain = FilterChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
    }

    #[test]
    fn test_filter_chain_empty_matches_all() {
        let chain = FilterChain::default();
        assert!(chain.matches(&make_event("Cualquier cosa", None, None)));
    }

    #[test]
    fn test_filter_chain() {
        let mut chain = FilterChain::new();
        chain.add(KeywordFilter::required(vec!["soda".to_string()]));
        chain.add(DateFilter::new(Some(date(3, 1)), None));

        assert_eq!(chain.len(), 2);
        assert!(chain.matches(&make_event("Soda Stereo Tributo", None, Some(date(4, 1)))));
        assert!(!chain.matches(&make_event("Soda Stereo Tributo", None, Some(date(2, 1)))));
        assert!(!chain.matches(&make_event("Charly García", None, Some(date(4, 1)))));
    }

    #[test]
    fn test_filter_chain_apply() {
        let mut chain = FilterChain::new();
        chain.add(VenueFilter::new("Luna Park"));

        let events = vec![
            make_event("A", Some("Estadio Luna Park"), None),
            make_event("B", Some("Teatro Caupolicán"), None),
            make_event("C", None, None),
        ];

        let filtered = chain.apply(events);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "A");
    }

    #[test]
    fn test_filter_chain_descriptions() {
        let chain = FilterChainBuilder::new()
            .keywords(vec!["cadillacs".to_string()])
            .date_range(Some(date(1, 1)), Some(date(12, 31)))
            .venue(Some("Movistar Arena".to_string()))
            .build();

        let descriptions = chain.descriptions();
        assert_eq!(descriptions.len(), 3);
        assert!(descriptions[0].contains("Must contain"));
        assert!(descriptions[1].contains("Date"));
        assert!(descriptions[2].contains("Venue"));
    }

    #[test]
    fn test_filter_chain_builder_no_filters_when_disabled() {
        let chain = FilterChainBuilder::new()
            .keywords(Vec::new())
            .exclude_keywords(Vec::new())
            .date_range(None, None)
            .venue(None)
            .venue(Some("  ".to_string()))
            .build();

        assert!(chain.is_empty());
    }

    #[test]
    fn test_filter_chain_builder_keywords() {
        let chain = FilterChainBuilder::new()
            .keywords(vec!["laferte".to_string()])
            .exclude_keywords(vec!["suspendido".to_string()])
            .build();

        assert_eq!(chain.len(), 2);
        assert!(chain.matches(&make_event("Mon Laferte en vivo", None, None)));
        assert!(!chain.matches(&make_event("Mon Laferte (SUSPENDIDO)", None, None)));
        assert!(!chain.matches(&make_event("Los Jaivas", None, None)));
    }
}
