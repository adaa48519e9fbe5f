//! Venue name filtering.

use super::Filter;
use crate::parsing::text::strip_accents;
use crate::ticketera::EventSummary;

/// Keeps events whose venue contains the given text (case and accent insensitive).
pub struct VenueFilter {
    needle: String,
}

impl VenueFilter {
    pub fn new(venue: impl AsRef<str>) -> Self {
        Self { needle: strip_accents(venue.as_ref().trim()).to_lowercase() }
    }
}

impl Filter for VenueFilter {
    fn matches(&self, event: &EventSummary) -> bool {
        event
            .venue
            .as_deref()
            .is_some_and(|v| strip_accents(v).to_lowercase().contains(&self.needle))
    }

    fn description(&self) -> String {
        format!("Venue contains: {}", self.needle)
    }
}
